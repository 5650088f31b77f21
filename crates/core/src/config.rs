//! Client configuration: where each bus scope listens and, on packaged
//! platforms, how resource types map onto global resource directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::BusScope;

const DEFAULT_CONFIG_PATH: &str = "/etc/mlops-agent/client.toml";
const SYSTEM_SOCKET: &str = "/run/mlops-agent/system_bus_socket";
const SESSION_DIR: &str = "mlops-agent";
const SESSION_SOCKET: &str = "session_bus_socket";

/// Packaged-application context (`[package]` table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Application id of the calling process. `None` means the process is
    /// not running as a packaged application.
    pub app_id: Option<String>,
    /// Global resource directory per resource type.
    #[serde(default)]
    pub resource_paths: BTreeMap<String, PathBuf>,
}

/// Runtime configuration for the agent client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub system_socket: PathBuf,
    pub session_socket: Option<PathBuf>,
    /// Presence selects the packaging-aware payload rewriter.
    pub package: Option<PackageConfig>,
}

impl Config {
    /// Socket to dial for `scope`, if one is configured.
    #[must_use]
    pub fn socket_for(&self, scope: BusScope) -> Option<&Path> {
        match scope {
            BusScope::System => Some(&self.system_socket),
            BusScope::Session => self.session_socket.as_deref(),
        }
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has unknown keys.
    pub fn from_toml(text: &str) -> eyre::Result<Self> {
        toml::from_str(text).map_err(|e| eyre::eyre!("invalid client configuration: {e}"))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read {}: {e}", path.display()))?;
        Self::from_toml(&text).map_err(|e| eyre::eyre!("{}: {e}", path.display()))
    }

    /// Load `/etc/mlops-agent/client.toml` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default() -> eyre::Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = DEFAULT_CONFIG_PATH, "no client configuration, using defaults");
            Ok(Self::default())
        }
    }
}

fn default_session_socket() -> Option<PathBuf> {
    dirs::runtime_dir().map(|dir| dir.join(SESSION_DIR).join(SESSION_SOCKET))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system_socket: PathBuf::from(SYSTEM_SOCKET),
            session_socket: default_session_socket(),
            package: None,
        }
    }
}
