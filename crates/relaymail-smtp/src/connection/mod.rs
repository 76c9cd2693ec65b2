//! Relay connection management.

mod client;
mod config;
mod stream;

pub use client::SmtpConnection;
pub use config::{ConnectionConfig, ConnectionConfigBuilder, Credentials};
pub use stream::{MAX_LINE_LENGTH, RelayStream};
