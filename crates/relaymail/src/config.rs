//! Relay settings loaded from JSON.

use crate::error::Result;
use relaymail_smtp::{ConnectionConfig, RelayPool};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Where and how to relay outgoing mail.
///
/// Every field has a default, so `{}` is a valid settings document that
/// relays through `localhost:25`.
///
/// ```
/// use relaymail::Settings;
///
/// let settings = Settings::from_json(r#"{"relays": "mx1:2525,mx2"}"#).unwrap();
/// let pool = settings.build_pool().unwrap();
/// assert_eq!(pool.max_attempts(), 2);
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Comma separated `host[:port]` list.
    pub relays: String,
    /// Hostname announced in EHLO.
    pub client_hostname: String,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per read/write timeout in seconds.
    pub io_timeout_secs: u64,
    /// `AUTH LOGIN` username.
    pub username: Option<String>,
    /// `AUTH LOGIN` password.
    pub password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let config = ConnectionConfig::default();
        Self {
            relays: "localhost".to_string(),
            client_hostname: config.client_hostname,
            connect_timeout_secs: config.connect_timeout.as_secs(),
            io_timeout_secs: config.io_timeout.as_secs(),
            username: None,
            password: None,
        }
    }
}

impl Settings {
    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`](crate::Error::Settings) on malformed JSON
    /// or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Connection configuration shared by every relay.
    ///
    /// Authentication is enabled only when both username and password are
    /// non-empty.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::builder()
            .client_hostname(self.client_hostname.clone())
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .io_timeout(Duration::from_secs(self.io_timeout_secs))
            .credentials(
                self.username.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            )
            .build()
    }

    /// Builds a relay pool over the configured relays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Smtp`](crate::Error::Smtp) wrapping a configuration
    /// error if the relay list is malformed.
    pub fn build_pool(&self) -> Result<RelayPool> {
        Ok(RelayPool::with_config(
            &self.relays,
            self.connection_config(),
        )?)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("relays", &self.relays)
            .field("client_hostname", &self.client_hostname)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("io_timeout_secs", &self.io_timeout_secs)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
