//! Error types for message assembly.

/// Result type alias for message assembly.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a message cannot be assembled.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No envelope sender was given.
    #[error("Sender undefined")]
    MissingSender,

    /// None of To, Cc or Bcc has an address.
    #[error("No recipients")]
    NoRecipients,

    /// A header name or value cannot be written safely.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Priority outside 1 to 5.
    #[error("Invalid priority {0}: expected 1 to 5")]
    InvalidPriority(u8),

    /// An attachment file could not be read.
    #[error("Cannot read attachment {path}: {source}")]
    Attachment {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
