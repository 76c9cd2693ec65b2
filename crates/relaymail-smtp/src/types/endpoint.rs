//! Relay endpoint addresses.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Port used when a relay entry does not name one.
pub const DEFAULT_PORT: u16 = 25;

/// One relay a transport can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayEndpoint {
    /// Relay hostname or IP address.
    pub host: String,
    /// Relay TCP port.
    pub port: u16,
}

impl RelayEndpoint {
    /// Creates an endpoint from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(Error::Config("relay host must be specified".into()));
        }
        Ok(Self { host, port })
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for RelayEndpoint {
    type Err = Error;

    /// Parses a single `host[:port]` entry.
    fn from_str(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        let (host, port) = match entry.split_once(':') {
            Some((host, port)) => (host.trim(), port.trim()),
            None => (entry, ""),
        };

        if host.is_empty() {
            return Err(Error::Config(format!(
                "relay host must be specified in entry \"{entry}\""
            )));
        }

        let port = if port.is_empty() {
            DEFAULT_PORT
        } else {
            port.parse::<u16>()
                .map_err(|_| Error::Config(format!("invalid relay port in entry \"{entry}\"")))?
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Parses a comma-separated relay list such as `"mx1:25, mx2:2525,mx3"`.
///
/// Order is preserved; it is the round-robin order of a pool.
///
/// # Errors
///
/// Returns [`Error::Config`] if any entry lacks a host or has a bad port.
pub fn parse_endpoint_list(list: &str) -> Result<Vec<RelayEndpoint>> {
    list.split(',')
        .map(|entry| {
            entry.parse::<RelayEndpoint>().map_err(|err| match err {
                Error::Config(reason) => {
                    Error::Config(format!("{reason}; relay list is \"{list}\""))
                }
                other => other,
            })
        })
        .collect()
}
