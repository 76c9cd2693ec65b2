//! The sending interface shared by single connections and pools.

use crate::error::Result;
use std::future::Future;

/// Something that can deliver an assembled message to a relay.
///
/// Implemented by [`SmtpConnection`](crate::SmtpConnection) and
/// [`RelayPool`](crate::RelayPool); test doubles implement it too.
pub trait Transport {
    /// Delivers `data` from `from` to every address in `recipients`.
    ///
    /// Returns the relay's final reply line.
    fn send(
        &mut self,
        from: &str,
        recipients: &[&str],
        data: &[u8],
    ) -> impl Future<Output = Result<String>> + Send;

    /// Releases any open relay session. Never fails.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}
