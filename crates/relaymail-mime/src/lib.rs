//! # relaymail-mime
//!
//! Assembles outgoing messages for the relaymail transport.
//!
//! ## Features
//!
//! - **Envelope**: sender plus To, Cc and Bcc recipients in that order
//! - **Headers**: normalized names, custom headers replacing generated ones
//! - **Encoding**: RFC 2047 encoded words, Base64 attachments
//! - **Multipart**: `multipart/mixed` when attachments are present
//! - **Wire form**: CRLF line endings and dot-stuffed body lines
//!
//! ## Quick Start
//!
//! ```
//! use relaymail_mime::{Attachment, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from(("Reports", "reports@example.com"))
//!     .to("team@example.com")
//!     .bcc("archive@example.com")
//!     .subject("Weekly numbers")
//!     .text("See attached.\n.\nThat dot line is safe.")
//!     .attach(Attachment::new("numbers.csv", "text/csv", "a,b\n1,2\n"))
//!     .build()?;
//!
//! assert_eq!(message.from(), "reports@example.com");
//! assert_eq!(message.recipients(), ["team@example.com", "archive@example.com"]);
//! assert!(!message.headers().contains("Bcc"));
//! # Ok::<(), relaymail_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod error;
mod header;
mod mailbox;
mod message;

pub mod encoding;

pub use attachment::{Attachment, DEFAULT_CONTENT_TYPE};
pub use error::{Error, Result};
pub use header::{Headers, normalize_name};
pub use mailbox::Mailbox;
pub use message::{MessageBuilder, OutgoingMessage};
