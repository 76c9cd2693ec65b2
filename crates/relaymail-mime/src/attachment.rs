//! File attachments.

use crate::error::{Error, Result};
use std::path::Path;

/// Content type used when none is given.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file carried as a base64 part of a `multipart/mixed` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name announced in `Content-Disposition`.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
    /// Raw content.
    pub content: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from bytes already in memory.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Reads a file, naming the attachment after it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| Error::Attachment {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |name| name.to_string_lossy().into_owned());

        Ok(Self::new(filename, DEFAULT_CONTENT_TYPE, content))
    }

    /// Replaces the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}
