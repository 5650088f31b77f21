//! Endpoint resolution: bind to a service on the first bus scope that answers.

use std::io;

use mlagent_core::{AgentError, BusScope, Config, Result, ServiceKind};
use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::{self, MethodCall, Response};
use crate::transport::Stream;

/// A live connection to one service on one bus scope.
pub trait Connection {
    /// Issue one call and wait for the daemon's response.
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be delivered or no well-formed
    /// response arrives.
    fn call(&mut self, call: &MethodCall) -> io::Result<Response>;
}

/// The single binding capability every service category goes through.
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// # Errors
    ///
    /// Returns an error if `kind` is not reachable on `scope`.
    fn bind(&self, kind: ServiceKind, scope: BusScope) -> io::Result<Self::Conn>;
}

/// A bound connection good for exactly one call. Dropping it releases the
/// connection, so it is released on every exit path.
pub struct EndpointHandle<C> {
    conn: C,
    kind: ServiceKind,
    scope: BusScope,
}

impl<C: Connection> EndpointHandle<C> {
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    #[must_use]
    pub const fn scope(&self) -> BusScope {
        self.scope
    }

    /// Call `member` on the bound service, consuming the handle.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the call does not complete.
    pub fn call(mut self, member: &str, args: Vec<Value>) -> io::Result<Response> {
        let call = MethodCall::new(self.kind, member, args);
        self.conn.call(&call)
    }
}

/// Bind `kind` on the first scope in [`BusScope::SEARCH_ORDER`] that accepts.
///
/// # Errors
///
/// Returns `AgentError::Unavailable` if no scope yields a connection.
pub fn resolve<C: Connector>(connector: &C, kind: ServiceKind) -> Result<EndpointHandle<C::Conn>> {
    for scope in BusScope::SEARCH_ORDER {
        match connector.bind(kind, scope) {
            Ok(conn) => {
                debug!(%kind, %scope, "bound endpoint");
                return Ok(EndpointHandle { conn, kind, scope });
            }
            Err(e) => debug!(%kind, %scope, %e, "bind failed"),
        }
    }
    warn!(%kind, "no bus scope yielded a connection");
    Err(AgentError::Unavailable(kind))
}

// ─── Local-socket connector ─────────────────────────────────────────────────

/// Binds over the per-scope sockets named in [`Config`].
#[derive(Debug, Clone)]
pub struct SocketConnector {
    config: Config,
}

impl SocketConnector {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Connector for SocketConnector {
    type Conn = SocketConnection;

    fn bind(&self, _kind: ServiceKind, scope: BusScope) -> io::Result<SocketConnection> {
        let path = self.config.socket_for(scope).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no {scope:?} socket configured"))
        })?;

        Ok(SocketConnection {
            stream: Stream::connect(path)?,
        })
    }
}

pub struct SocketConnection {
    stream: Stream,
}

impl Connection for SocketConnection {
    fn call(&mut self, call: &MethodCall) -> io::Result<Response> {
        protocol::write_call(&mut self.stream, call)?;
        protocol::read_response(&mut self.stream)
    }
}
