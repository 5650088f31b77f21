//! Pipeline service: stored descriptions and launched pipeline lifecycle.

use mlagent_core::{Result, ServiceKind};
use serde_json::json;
use tracing::instrument;

use crate::agent::{require, Agent};
use crate::endpoint::Connector;

impl<C: Connector> Agent<C> {
    /// Store `description` under `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name` or `description`; otherwise the
    /// resolution, transport or daemon error.
    #[instrument(skip(self, description), fields(description_len = description.len()))]
    pub fn pipeline_set_description(&self, name: &str, description: &str) -> Result<()> {
        require(name, "name")?;
        require(description, "description")?;
        self.invoke(
            ServiceKind::Pipeline,
            "set_pipeline",
            vec![json!(name), json!(description)],
        )?;
        Ok(())
    }

    /// Fetch the description stored under `name`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; otherwise the resolution,
    /// transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_get_description(&self, name: &str) -> Result<String> {
        require(name, "name")?;
        self.invoke(ServiceKind::Pipeline, "get_pipeline", vec![json!(name)])?
            .string(0)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; otherwise the resolution,
    /// transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_delete(&self, name: &str) -> Result<()> {
        require(name, "name")?;
        self.invoke(ServiceKind::Pipeline, "delete_pipeline", vec![json!(name)])?;
        Ok(())
    }

    /// Launch the pipeline stored under `name`, returning its id.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `name`; otherwise the resolution,
    /// transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_launch(&self, name: &str) -> Result<i64> {
        require(name, "name")?;
        self.invoke(ServiceKind::Pipeline, "launch_pipeline", vec![json!(name)])?
            .i64(0)
    }

    /// # Errors
    ///
    /// Resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_start(&self, id: i64) -> Result<()> {
        self.invoke(ServiceKind::Pipeline, "start_pipeline", vec![json!(id)])?;
        Ok(())
    }

    /// # Errors
    ///
    /// Resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_stop(&self, id: i64) -> Result<()> {
        self.invoke(ServiceKind::Pipeline, "stop_pipeline", vec![json!(id)])?;
        Ok(())
    }

    /// Tear down a launched pipeline. The stored description is kept.
    ///
    /// # Errors
    ///
    /// Resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_destroy(&self, id: i64) -> Result<()> {
        self.invoke(ServiceKind::Pipeline, "destroy_pipeline", vec![json!(id)])?;
        Ok(())
    }

    /// Runtime state of a launched pipeline, as the daemon numbers it.
    ///
    /// # Errors
    ///
    /// Resolution, transport or daemon error.
    #[instrument(skip(self))]
    pub fn pipeline_get_state(&self, id: i64) -> Result<i32> {
        self.invoke(ServiceKind::Pipeline, "get_state", vec![json!(id)])?
            .i32(0)
    }
}
