//! Addresses with an optional display name.

use crate::encoding::{encode_word, is_plain};
use crate::error::Result;
use crate::header::check_value;

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Bare address used in the envelope.
    pub address: String,
    /// Display name shown in headers.
    pub name: Option<String>,
}

impl Mailbox {
    /// Creates a mailbox without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Creates a mailbox with a display name. A blank name is dropped.
    #[must_use]
    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: address.into(),
            name: (!name.trim().is_empty()).then_some(name),
        }
    }

    /// Renders the mailbox for a header, encoding the name if needed.
    pub(crate) fn render(&self, charset: &str) -> Result<String> {
        check_value("address", &self.address)?;
        match &self.name {
            None => Ok(format!("<{}>", self.address)),
            Some(name) => {
                check_value("display name", name)?;
                if is_plain(name) {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    Ok(format!("\"{escaped}\" <{}>", self.address))
                } else {
                    Ok(format!("{} <{}>", encode_word(name, charset), self.address))
                }
            }
        }
    }
}

impl From<&str> for Mailbox {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Mailbox {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl From<(&str, &str)> for Mailbox {
    /// `(name, address)`
    fn from((name, address): (&str, &str)) -> Self {
        Self::named(name, address)
    }
}
