//! # relaymail-smtp
//!
//! Outbound SMTP transport for handing messages to one or more mail relays.
//!
//! ## Features
//!
//! - **Pipelining**: RSET, MAIL FROM and RCPT TO are batched when the relay
//!   advertises PIPELINING (RFC 2920); every deferred reply is read, in order,
//!   before the next non-pipelinable command's reply
//! - **Recovery**: each send starts with RSET, so a connection that saw a
//!   rejected envelope can be reused immediately
//! - **Authentication**: base64 `AUTH LOGIN`
//! - **Relay pool**: round-robin over several relays with failover on
//!   connection errors
//! - **Diagnostics**: every error carries the dialog transcript
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_smtp::RelayPool;
//!
//! #[tokio::main]
//! async fn main() -> relaymail_smtp::Result<()> {
//!     let mut pool = RelayPool::new("mx1.example.com:25,mx2.example.com")?;
//!
//!     let message = b"Subject: Test\r\n\r\nHello, World!";
//!     let reply = pool
//!         .send("sender@example.com", &["recipient@example.com"], message)
//!         .await?;
//!     println!("{reply}");
//!
//!     pool.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! | error | meaning | pool behaviour |
//! |---|---|---|
//! | [`Error::Config`] | bad relay list | returned at construction |
//! | [`Error::Connection`] | relay unreachable or socket died; socket closed | next relay is tried |
//! | [`Error::Protocol`] | relay answered with an unexpected status; socket kept | returned immediately |
//! | [`Error::InvalidArgument`] | CR or LF in an address or the client hostname; nothing sent | returned immediately |
//!
//! ## Modules
//!
//! - [`command`]: SMTP command serialization and pipelining classification
//! - [`connection`]: Relay connection and configuration
//! - [`parser`]: Reply parsing helpers
//! - [`pool`]: Round-robin relay pool
//! - [`transcript`]: Dialog transcript
//! - [`types`]: Reply codes and relay endpoints

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod pool;
pub mod transcript;
mod transport;
pub mod types;

pub use connection::{ConnectionConfig, ConnectionConfigBuilder, Credentials, SmtpConnection};
pub use error::{Error, Result};
pub use pool::{ConnectionFactory, RelayPool, SmtpConnectionFactory};
pub use transcript::Transcript;
pub use transport::Transport;
pub use types::{DEFAULT_PORT, RelayEndpoint, ReplyCode, parse_endpoint_list};
