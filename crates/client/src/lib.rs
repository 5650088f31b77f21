//! Synchronous client for the ML service daemon.
//!
//! Each operation binds its own endpoint on the system bus, falling back to
//! the session bus, issues one call and releases the endpoint before
//! returning. There is no shared mutable state, so an [`Agent`] can be used
//! from many threads at once.

pub mod agent;
pub mod endpoint;
pub mod model;
pub mod pipeline;
pub mod protocol;
pub mod resource;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_util;

pub use agent::Agent;
pub use endpoint::{resolve, Connection, Connector, EndpointHandle, SocketConnector};
pub use protocol::{BusCodec, MethodCall, Response};
