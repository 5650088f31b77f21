//! Scripted connector for exercising call wrappers without a daemon.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use mlagent_core::{BusScope, IdentityRewriter, ServiceKind};
use serde_json::Value;

use crate::endpoint::{Connection, Connector};
use crate::protocol::{MethodCall, Response};
use crate::Agent;

/// What every connection answers.
pub enum Script {
    Reply(Response),
    /// The connection drops before a response arrives.
    Broken,
}

impl Script {
    pub fn ok(values: Vec<Value>) -> Self {
        Self::Reply(Response::Return { result: 0, values })
    }

    pub fn rejected(result: i32) -> Self {
        Self::Reply(Response::Return {
            result,
            values: Vec::new(),
        })
    }

    pub fn fault(code: i32) -> Self {
        Self::Reply(Response::Fault {
            code,
            message: "dispatch failed".to_owned(),
        })
    }
}

struct Shared {
    script: Script,
    binds: Mutex<Vec<(ServiceKind, BusScope)>>,
    calls: Mutex<Vec<MethodCall>>,
    released: AtomicUsize,
}

#[derive(Clone)]
pub struct StubConnector {
    shared: Arc<Shared>,
    unreachable: Vec<BusScope>,
}

impl StubConnector {
    pub fn new(script: Script) -> Self {
        Self {
            shared: Arc::new(Shared {
                script,
                binds: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                released: AtomicUsize::new(0),
            }),
            unreachable: Vec::new(),
        }
    }

    pub fn unreachable(mut self, scopes: &[BusScope]) -> Self {
        self.unreachable = scopes.to_vec();
        self
    }

    pub fn binds(&self) -> Vec<(ServiceKind, BusScope)> {
        lock(&self.shared.binds).clone()
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        lock(&self.shared.calls).clone()
    }

    /// Number of connections dropped so far.
    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    /// Asserts nothing was bound, called or released.
    pub fn assert_untouched(&self) {
        assert!(self.binds().is_empty(), "unexpected bind: {:?}", self.binds());
        assert!(self.calls().is_empty(), "unexpected call: {:?}", self.calls());
        assert_eq!(self.released(), 0);
    }

    /// Asserts exactly one call went out, releasing one connection.
    pub fn single_call(&self) -> MethodCall {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected one call, got {calls:?}");
        assert_eq!(self.released(), 1);
        calls.into_iter().next().unwrap()
    }
}

impl Connector for StubConnector {
    type Conn = StubConnection;

    fn bind(&self, kind: ServiceKind, scope: BusScope) -> io::Result<StubConnection> {
        lock(&self.shared.binds).push((kind, scope));
        if self.unreachable.contains(&scope) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "scope down"));
        }
        Ok(StubConnection {
            shared: Arc::clone(&self.shared),
        })
    }
}

pub struct StubConnection {
    shared: Arc<Shared>,
}

impl Connection for StubConnection {
    fn call(&mut self, call: &MethodCall) -> io::Result<Response> {
        lock(&self.shared.calls).push(call.clone());
        match &self.shared.script {
            Script::Reply(resp) => Ok(resp.clone()),
            Script::Broken => Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away")),
        }
    }
}

impl Drop for StubConnection {
    fn drop(&mut self) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Agent over `stub` with the baseline rewriter.
pub fn agent(stub: &StubConnector) -> Agent<StubConnector> {
    Agent::new(stub.clone(), Box::new(IdentityRewriter))
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
