//! Resource registry service.

use mlagent_core::{Result, ServiceKind};
use serde_json::json;
use tracing::instrument;

use crate::agent::{require, Agent};
use crate::endpoint::Connector;

impl<C: Connector> Agent<C> {
    /// Add a resource file under `name`. Absent `description` and
    /// `app_info` are sent as empty strings.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name` or `path`; otherwise the
    /// resolution, transport or daemon error.
    #[instrument(skip(self, description, app_info))]
    pub fn resource_add(
        &self,
        name: &str,
        path: &str,
        description: Option<&str>,
        app_info: Option<&str>,
    ) -> Result<()> {
        require(name, "name")?;
        require(path, "path")?;
        self.invoke(
            ServiceKind::Resource,
            "add",
            vec![
                json!(name),
                json!(path),
                json!(description.unwrap_or_default()),
                json!(app_info.unwrap_or_default()),
            ],
        )?;
        Ok(())
    }

    /// Remove every resource registered under `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; otherwise the resolution,
    /// transport or daemon error.
    #[instrument(skip(self))]
    pub fn resource_delete(&self, name: &str) -> Result<()> {
        require(name, "name")?;
        self.invoke(ServiceKind::Resource, "delete", vec![json!(name)])?;
        Ok(())
    }

    /// JSON array of the resources registered under `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; `Parse` if the payload cannot be
    /// rewritten; otherwise the resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn resource_get(&self, name: &str) -> Result<String> {
        require(name, "name")?;
        let raw = self
            .invoke(ServiceKind::Resource, "get", vec![json!(name)])?
            .string(0)?;
        self.rewrite(&raw)
    }
}
