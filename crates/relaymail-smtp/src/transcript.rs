//! Session transcript kept for diagnostics.

use std::fmt;

/// Placeholder recorded instead of authentication payloads.
pub const REDACTED: &str = "<credentials>";

/// One line of a relay dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Sent by us.
    Sent(String),
    /// Received from the relay.
    Received(String),
}

/// Append-only log of everything sent to and received from a relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outgoing command.
    pub fn sent(&mut self, line: impl Into<String>) {
        self.entries.push(Entry::Sent(line.into()));
    }

    /// Records an incoming reply line.
    pub fn received(&mut self, line: impl Into<String>) {
        self.entries.push(Entry::Received(line.into()));
    }

    /// Drops all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the recorded entries in order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry {
                Entry::Sent(line) => writeln!(f, "C: {line}")?,
                Entry::Received(line) => writeln!(f, "S: {line}")?,
            }
        }
        Ok(())
    }
}
