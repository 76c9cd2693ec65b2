//! # relaymail
//!
//! Sends outgoing mail through one or more SMTP relays.
//!
//! This crate wires the two halves together:
//! - [`relaymail_mime`] assembles the envelope and the wire bytes
//! - [`relaymail_smtp`] delivers them over a pipelining SMTP dialog, spread
//!   round-robin over a pool of relays with failover
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail::{Mailer, MessageBuilder, Settings};
//!
//! #[tokio::main]
//! async fn main() -> relaymail::Result<()> {
//!     let settings = Settings::from_json(r#"{"relays": "mx1.example.com,mx2.example.com"}"#)?;
//!     let mut mailer = Mailer::from_settings(&settings)?;
//!
//!     let message = MessageBuilder::new()
//!         .from("app@example.com")
//!         .to("user@example.com")
//!         .subject("Welcome")
//!         .text("Hello!")
//!         .build()?;
//!
//!     let reply = mailer.send(&message).await?;
//!     println!("{reply}");
//!
//!     mailer.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! A pool is driven through `&mut self`; tasks that share one wrap it in a
//! `tokio::sync::Mutex`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod mailer;

pub use config::Settings;
pub use error::{Error, Result};
pub use mailer::Mailer;

pub use relaymail_mime::{Attachment, Mailbox, MessageBuilder, OutgoingMessage};
pub use relaymail_smtp::{
    ConnectionConfig, RelayEndpoint, RelayPool, SmtpConnection, Transcript, Transport,
};

pub use relaymail_mime;
pub use relaymail_smtp;
