//! The agent: resolve, call once, reconcile.
//!
//! Every operation follows the same steps: validate inputs locally, resolve an
//! endpoint, issue exactly one call, release the endpoint, then fold the
//! transport flag and the daemon's result code into one outcome. Nothing is
//! cached or retried.

use std::io;

use mlagent_core::{
    reconcile, rewrite, AgentError, Config, PayloadRewriter, Result, ServiceKind,
};
use serde_json::Value;
use tracing::{trace, warn};

use crate::endpoint::{self, Connector, SocketConnector};
use crate::protocol::Response;

pub struct Agent<C = SocketConnector> {
    connector: C,
    rewriter: Box<dyn PayloadRewriter>,
}

impl Agent<SocketConnector> {
    /// Agent over the configured bus sockets, with the rewriter the
    /// configuration selects.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(SocketConnector::new(config), rewrite::rewriter_for(config))
    }
}

impl<C: Connector> Agent<C> {
    #[must_use]
    pub fn new(connector: C, rewriter: Box<dyn PayloadRewriter>) -> Self {
        Self {
            connector,
            rewriter,
        }
    }

    pub(crate) fn invoke(
        &self,
        kind: ServiceKind,
        member: &'static str,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let handle = endpoint::resolve(&self.connector, kind)?;
        let scope = handle.scope();
        // The handle is consumed here; the connection is gone before we reconcile.
        let response = handle.call(member, args).map_err(|e| {
            warn!(%kind, %scope, member, %e, "call did not complete");
            AgentError::Transport(e)
        })?;

        let (delivered, code, values) = match response {
            Response::Return { result, values } => (true, result, values),
            Response::Fault { code, message } => {
                warn!(%kind, member, code, %message, "call faulted");
                (false, code, Vec::new())
            }
        };

        if let Err(e) = reconcile(delivered, code) {
            warn!(%kind, member, code, "daemon rejected call");
            return Err(e);
        }
        trace!(%kind, %scope, member, "call succeeded");
        Ok(Reply { member, values })
    }

    pub(crate) fn rewrite(&self, raw: &str) -> Result<String> {
        self.rewriter.rewrite(raw)
    }
}

/// Typed outputs of a successful call.
#[derive(Debug)]
pub(crate) struct Reply {
    member: &'static str,
    values: Vec<Value>,
}

impl Reply {
    fn malformed(&self, index: usize, expected: &str) -> AgentError {
        warn!(member = self.member, index, expected, "malformed reply");
        AgentError::Transport(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("`{}` reply lacks {expected} output #{index}", self.member),
        ))
    }

    fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn string(&mut self, index: usize) -> Result<String> {
        match self.values.get_mut(index).map(Value::take) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(self.malformed(index, "a string")),
        }
    }

    pub fn i64(&self, index: usize) -> Result<i64> {
        self.value(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.malformed(index, "an i64"))
    }

    pub fn i32(&self, index: usize) -> Result<i32> {
        self.value(index)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| self.malformed(index, "an i32"))
    }

    pub fn u32(&self, index: usize) -> Result<u32> {
        self.value(index)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.malformed(index, "a u32"))
    }
}

/// Reject empty required strings before anything leaves the process.
pub(crate) fn require(value: &str, what: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(AgentError::InvalidArgument(what));
    }
    Ok(())
}

/// Version 0 is never assigned by the daemon.
pub(crate) fn require_version(version: u32) -> Result<()> {
    if version == 0 {
        return Err(AgentError::InvalidArgument("version"));
    }
    Ok(())
}
