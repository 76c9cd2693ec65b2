//! Connection configuration types.

use std::fmt;
use std::time::Duration;

/// Login credentials for the base64 `AUTH LOGIN` exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Relay connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Hostname announced in EHLO.
    pub client_hostname: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for each read and write.
    pub io_timeout: Duration,
    /// Credentials for `AUTH LOGIN`, if the relay requires them.
    pub credentials: Option<Credentials>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            client_hostname: "localhost".to_string(),
            connect_timeout: Duration::from_secs(3),
            io_timeout: Duration::from_secs(30),
            credentials: None,
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Sets the hostname announced in EHLO.
    #[must_use]
    pub fn client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.client_hostname = hostname.into();
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Enables `AUTH LOGIN` with the given credentials.
    ///
    /// Empty usernames or passwords leave authentication disabled.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let credentials = Credentials::new(username, password);
        self.config.credentials = (!credentials.username.is_empty()
            && !credentials.password.is_empty())
        .then_some(credentials);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.client_hostname, "localhost");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.io_timeout, Duration::from_secs(30));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ConnectionConfig::builder()
            .client_hostname("mailer.example.com")
            .connect_timeout(Duration::from_secs(1))
            .io_timeout(Duration::from_millis(500))
            .credentials("user", "secret")
            .build();

        assert_eq!(config.client_hostname, "mailer.example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.io_timeout, Duration::from_millis(500));
        assert_eq!(
            config.credentials,
            Some(Credentials::new("user", "secret"))
        );
    }

    #[test]
    fn test_blank_credentials_disable_auth() {
        let config = ConnectionConfig::builder().credentials("user", "").build();
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let text = format!("{:?}", Credentials::new("user", "hunter2"));
        assert!(text.contains("user"));
        assert!(!text.contains("hunter2"));
    }
}
