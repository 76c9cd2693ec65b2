//! Round-robin relay pool with failover.

use crate::connection::{ConnectionConfig, SmtpConnection};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{RelayEndpoint, parse_endpoint_list};
use std::fmt;
use tracing::{debug, warn};

/// Creates the transport used for one relay endpoint.
pub trait ConnectionFactory {
    /// Transport produced for each endpoint.
    type Connection: Transport;

    /// Builds an unconnected transport for `endpoint`.
    fn create(&self, endpoint: &RelayEndpoint) -> Self::Connection;
}

impl<F, T> ConnectionFactory for F
where
    F: Fn(&RelayEndpoint) -> T,
    T: Transport,
{
    type Connection = T;

    fn create(&self, endpoint: &RelayEndpoint) -> T {
        self(endpoint)
    }
}

/// Factory producing real [`SmtpConnection`]s sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct SmtpConnectionFactory {
    config: ConnectionConfig,
}

impl SmtpConnectionFactory {
    /// Creates a factory handing `config` to every connection.
    #[must_use]
    pub const fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl ConnectionFactory for SmtpConnectionFactory {
    type Connection = SmtpConnection;

    fn create(&self, endpoint: &RelayEndpoint) -> SmtpConnection {
        SmtpConnection::new(endpoint.clone(), self.config.clone())
    }
}

/// Spreads sends over several relays and fails over when one is down.
///
/// Each send goes to the next relay in list order. If that relay cannot be
/// reached, the send moves on to the following one, trying each relay at most
/// once per send. A relay that answers with an unexpected status is not
/// skipped: the error is returned as is.
///
/// Connections are created on first use and kept open between sends.
pub struct RelayPool<F: ConnectionFactory = SmtpConnectionFactory> {
    endpoints: Vec<RelayEndpoint>,
    connections: Vec<Option<F::Connection>>,
    cursor: Option<usize>,
    max_attempts: usize,
    factory: F,
}

impl RelayPool {
    /// Creates a pool of real SMTP connections with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the relay list is malformed.
    pub fn new(relays: &str) -> Result<Self> {
        Self::with_factory(relays, SmtpConnectionFactory::default())
    }

    /// Creates a pool of real SMTP connections sharing `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the relay list is malformed.
    pub fn with_config(relays: &str, config: ConnectionConfig) -> Result<Self> {
        Self::with_factory(relays, SmtpConnectionFactory::new(config))
    }
}

impl<F: ConnectionFactory> RelayPool<F> {
    /// Creates a pool from a `host[:port],...` list and a factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the relay list is malformed.
    pub fn with_factory(relays: &str, factory: F) -> Result<Self> {
        Self::from_endpoints(parse_endpoint_list(relays)?, factory)
    }

    /// Creates a pool from already parsed endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `endpoints` is empty.
    pub fn from_endpoints(endpoints: Vec<RelayEndpoint>, factory: F) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::Config("at least one relay is required".into()));
        }

        let max_attempts = endpoints.len();
        let connections = endpoints.iter().map(|_| None).collect();
        Ok(Self {
            endpoints,
            connections,
            cursor: None,
            max_attempts,
            factory,
        })
    }

    /// Returns the relays in round-robin order.
    #[must_use]
    pub fn endpoints(&self) -> &[RelayEndpoint] {
        &self.endpoints
    }

    /// Maximum relays tried by a single send.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns the transport for the relay at `index`, if one was created.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<&F::Connection> {
        self.connections.get(index).and_then(Option::as_ref)
    }

    /// Sends through the next relay, failing over on connection errors.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Protocol`] met, or the last
    /// [`Error::Connection`] once every relay has been tried.
    pub async fn send(&mut self, from: &str, recipients: &[&str], data: &[u8]) -> Result<String> {
        let mut remaining = self.max_attempts;

        loop {
            let index = self.advance();
            let connection = self.connections[index]
                .get_or_insert_with(|| self.factory.create(&self.endpoints[index]));

            match connection.send(from, recipients, data).await {
                Ok(reply) => {
                    debug!(endpoint = %self.endpoints[index], "Message accepted");
                    return Ok(reply);
                }
                Err(err) if err.is_connection() => {
                    remaining -= 1;
                    if remaining == 0 {
                        return Err(err);
                    }
                    warn!(
                        endpoint = %self.endpoints[index],
                        error = %err,
                        remaining,
                        "Relay unavailable, trying next"
                    );
                }
                Err(err) => {
                    debug!(
                        endpoint = %self.endpoints[index],
                        transient = err.is_transient(),
                        "Send rejected"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Disconnects every created transport and forgets them.
    ///
    /// The round-robin position is kept.
    pub async fn disconnect(&mut self) {
        for slot in &mut self.connections {
            if let Some(mut connection) = slot.take() {
                connection.disconnect().await;
            }
        }
    }

    fn advance(&mut self) -> usize {
        let index = self
            .cursor
            .map_or(0, |cursor| (cursor + 1) % self.endpoints.len());
        self.cursor = Some(index);
        index
    }
}

impl<F> Transport for RelayPool<F>
where
    F: ConnectionFactory + Send,
    F::Connection: Send,
{
    async fn send(&mut self, from: &str, recipients: &[&str], data: &[u8]) -> Result<String> {
        Self::send(self, from, recipients, data).await
    }

    async fn disconnect(&mut self) {
        Self::disconnect(self).await;
    }
}

impl<F: ConnectionFactory> fmt::Debug for RelayPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayPool")
            .field("endpoints", &self.endpoints)
            .field("cursor", &self.cursor)
            .field("max_attempts", &self.max_attempts)
            .field(
                "connections",
                &self.connections.iter().filter(|c| c.is_some()).count(),
            )
            .finish_non_exhaustive()
    }
}
