//! Error types for the mailer.

use thiserror::Error;

/// Errors that can occur while assembling or sending a message.
#[derive(Debug, Error)]
pub enum Error {
    /// The relay dialog failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] relaymail_smtp::Error),

    /// The message could not be assembled.
    #[error("Message error: {0}")]
    Message(#[from] relaymail_mime::Error),

    /// Settings could not be parsed.
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
