//! Core SMTP types.

mod endpoint;
mod reply;

pub use endpoint::{DEFAULT_PORT, RelayEndpoint, parse_endpoint_list};
pub use reply::ReplyCode;
