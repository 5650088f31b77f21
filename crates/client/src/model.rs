//! Model registry service.
//!
//! Models are keyed by `(name, version)`; versions are assigned by the daemon
//! on registration and start at 1. Query results are JSON and go through the
//! payload rewriter before they are returned.

use mlagent_core::{Result, ServiceKind};
use serde_json::json;
use tracing::instrument;

use crate::agent::{require, require_version, Agent};
use crate::endpoint::Connector;

impl<C: Connector> Agent<C> {
    /// Register a model file, returning the version the daemon assigned.
    ///
    /// Absent `description` and `app_info` are sent as empty strings.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name` or `path`; otherwise the
    /// resolution, transport or daemon error.
    #[instrument(skip(self, description, app_info))]
    pub fn model_register(
        &self,
        name: &str,
        path: &str,
        activate: bool,
        description: Option<&str>,
        app_info: Option<&str>,
    ) -> Result<u32> {
        require(name, "name")?;
        require(path, "path")?;
        self.invoke(
            ServiceKind::Model,
            "register",
            vec![
                json!(name),
                json!(path),
                json!(activate),
                json!(description.unwrap_or_default()),
                json!(app_info.unwrap_or_default()),
            ],
        )?
        .u32(0)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name` or `description` or a zero
    /// `version`; otherwise the resolution, transport or daemon error.
    #[instrument(skip(self, description))]
    pub fn model_update_description(
        &self,
        name: &str,
        version: u32,
        description: &str,
    ) -> Result<()> {
        require(name, "name")?;
        require(description, "description")?;
        require_version(version)?;
        self.invoke(
            ServiceKind::Model,
            "update_description",
            vec![json!(name), json!(version), json!(description)],
        )?;
        Ok(())
    }

    /// Make `version` the active version of `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name` or a zero `version`; otherwise
    /// the resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn model_activate(&self, name: &str, version: u32) -> Result<()> {
        require(name, "name")?;
        require_version(version)?;
        self.invoke(
            ServiceKind::Model,
            "activate",
            vec![json!(name), json!(version)],
        )?;
        Ok(())
    }

    /// JSON description of one model version.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name` or a zero `version`; `Parse` if
    /// the payload cannot be rewritten; otherwise the resolution, transport or
    /// daemon error.
    #[instrument(skip(self))]
    pub fn model_get(&self, name: &str, version: u32) -> Result<String> {
        require(name, "name")?;
        require_version(version)?;
        let raw = self
            .invoke(ServiceKind::Model, "get", vec![json!(name), json!(version)])?
            .string(0)?;
        self.rewrite(&raw)
    }

    /// JSON description of the active version of `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; `Parse` if the payload cannot be
    /// rewritten; otherwise the resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn model_get_activated(&self, name: &str) -> Result<String> {
        require(name, "name")?;
        let raw = self
            .invoke(ServiceKind::Model, "get_activated", vec![json!(name)])?
            .string(0)?;
        self.rewrite(&raw)
    }

    /// JSON array describing every version of `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; `Parse` if the payload cannot be
    /// rewritten; otherwise the resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn model_get_all(&self, name: &str) -> Result<String> {
        require(name, "name")?;
        let raw = self
            .invoke(ServiceKind::Model, "get_all", vec![json!(name)])?
            .string(0)?;
        self.rewrite(&raw)
    }

    /// Remove a model version. `force` removes it even while active; the
    /// daemon decides what `version` 0 means.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; otherwise the resolution,
    /// transport or daemon error.
    #[instrument(skip(self))]
    pub fn model_delete(&self, name: &str, version: u32, force: bool) -> Result<()> {
        require(name, "name")?;
        self.invoke(
            ServiceKind::Model,
            "delete",
            vec![json!(name), json!(version), json!(force)],
        )?;
        Ok(())
    }
}
