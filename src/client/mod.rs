//! Authenticated HTTP access.
//!
//! [`Gateway`] is the only way domain calls reach the network with a
//! credential attached. Refresh and logout requests are sent directly and
//! never pass through it.

mod gateway;
mod request;

pub use gateway::Gateway;
pub use request::ApiRequest;
