//! Error types for relay operations.

use crate::parser::reply_code;
use crate::transcript::Transcript;
use crate::types::{RelayEndpoint, ReplyCode};
use std::io;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Relay error types.
///
/// Connection and protocol failures carry the session transcript up to the
/// point of failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed relay list or missing relay host.
    #[error("Invalid relay configuration: {0}")]
    Config(String),

    /// An address or hostname that cannot be written as one command line.
    /// Nothing was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The relay could not be reached, refused the session, or the socket
    /// died mid-dialog. The socket has already been closed.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection {
        /// Relay the connection was for.
        endpoint: RelayEndpoint,
        /// What went wrong.
        reason: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<io::Error>,
        /// Dialog so far.
        transcript: Transcript,
    },

    /// The relay answered with a status other than the one the command
    /// expects. The socket is still aligned and left open.
    #[error("Unexpected reply from {endpoint} to `{command}`: expected {expected}, got `{reply}`")]
    Protocol {
        /// Relay that answered.
        endpoint: RelayEndpoint,
        /// Command the reply belongs to.
        command: String,
        /// Status the command expects.
        expected: ReplyCode,
        /// Reply text as received.
        reply: String,
        /// Outcome of the command that flushed the pipeline, when this
        /// failure surfaced while draining pipelined replies.
        followed_by: Option<String>,
        /// Dialog so far.
        transcript: Transcript,
    },
}

impl Error {
    /// Creates a connection error without an I/O source or transcript.
    ///
    /// Useful for [`Transport`](crate::Transport) implementations that do
    /// not speak SMTP themselves.
    #[must_use]
    pub fn connection(endpoint: &RelayEndpoint, reason: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.clone(),
            reason: reason.into(),
            source: None,
            transcript: Transcript::default(),
        }
    }

    /// Returns true for failures the pool may retry on another relay.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns true for status mismatches from a reachable relay.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns true if the relay refused with a 4xx status; the same send
    /// may succeed later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.protocol_reply_code().is_some_and(ReplyCode::is_transient)
    }

    /// Returns true if the relay refused with a 5xx status.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.protocol_reply_code().is_some_and(ReplyCode::is_permanent)
    }

    fn protocol_reply_code(&self) -> Option<ReplyCode> {
        match self {
            Self::Protocol { reply, .. } => reply_code(reply),
            _ => None,
        }
    }

    /// Returns the session transcript attached to this error.
    #[must_use]
    pub const fn transcript(&self) -> Option<&Transcript> {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) => None,
            Self::Connection { transcript, .. } | Self::Protocol { transcript, .. } => {
                Some(transcript)
            }
        }
    }

    /// Records what happened to the command that flushed the pipeline.
    pub(crate) fn followed_by(mut self, outcome: &Result<String>) -> Self {
        if let Self::Protocol { followed_by, .. } = &mut self {
            *followed_by = Some(match outcome {
                Ok(reply) => reply.clone(),
                Err(err) => err.to_string(),
            });
        }
        self
    }
}
