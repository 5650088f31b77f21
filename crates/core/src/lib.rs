//! Shared pieces of the ML agent client: the service catalogue, error codes,
//! configuration and payload path rewriting. No IPC, no async.

pub mod config;
pub mod error;
pub mod rewrite;

use std::fmt;

pub use config::{Config, PackageConfig};
pub use error::{reconcile, AgentError, Result};
pub use rewrite::{ConfiguredContext, IdentityRewriter, PackageContext, PackagedRewriter, PayloadRewriter};

/// Well-known bus name the ML service daemon owns on every scope.
pub const BUS_NAME: &str = "org.tizen.machinelearning.service";

/// Which of the daemon's services a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Pipeline,
    Model,
    Resource,
}

impl ServiceKind {
    #[must_use]
    pub const fn object_path(self) -> &'static str {
        match self {
            Self::Pipeline => "/Org/Tizen/MachineLearning/Service/Pipeline",
            Self::Model => "/Org/Tizen/MachineLearning/Service/Model",
            Self::Resource => "/Org/Tizen/MachineLearning/Service/Resource",
        }
    }

    #[must_use]
    pub const fn interface(self) -> &'static str {
        match self {
            Self::Pipeline => "org.tizen.machinelearning.service.pipeline",
            Self::Model => "org.tizen.machinelearning.service.model",
            Self::Resource => "org.tizen.machinelearning.service.resource",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Model => "model",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bus namespace a service may be registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusScope {
    System,
    Session,
}

impl BusScope {
    /// Scopes in the order endpoints are tried.
    pub const SEARCH_ORDER: [Self; 2] = [Self::System, Self::Session];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for BusScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
