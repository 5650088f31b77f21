//! Path rewriting for model and resource payloads.
//!
//! Packaged applications receive resources installed under a platform-managed
//! global directory, while the daemon stores paths relative to it. Payloads are
//! either one object or an array of objects, each carrying a `path` and an
//! `app_info` field that is itself JSON-encoded text:
//!
//! ```json
//! {"name": "m", "path": "rel/model.bin", "app_info": "{\"is_rpk\":\"T\",\"res_type\":\"type-a\"}"}
//! ```

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::PackageConfig;
use crate::{AgentError, Config, Result};

/// `is_rpk` value marking a packaged resource.
const RPK_MARKER: &str = "T";

/// Post-processing applied to JSON payloads before they reach the caller.
pub trait PayloadRewriter: Send + Sync {
    /// # Errors
    ///
    /// Returns `AgentError::Parse` if the payload lacks the structure the
    /// rewriter needs. No partial output is produced.
    fn rewrite(&self, json: &str) -> Result<String>;
}

/// Platform hook for the packaging-aware rewriter.
pub trait PackageContext: Send + Sync {
    fn is_packaged_app(&self) -> bool;

    /// Global resource directory for `res_type`.
    fn global_resource_path(&self, res_type: &str) -> Option<PathBuf>;
}

/// Baseline platforms: payloads pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl PayloadRewriter for IdentityRewriter {
    fn rewrite(&self, json: &str) -> Result<String> {
        Ok(json.to_owned())
    }
}

/// Rewrites the `path` of packaged resources to an absolute location.
#[derive(Debug, Clone)]
pub struct PackagedRewriter<P> {
    context: P,
}

impl<P: PackageContext> PackagedRewriter<P> {
    pub const fn new(context: P) -> Self {
        Self { context }
    }

    fn resolve_object(&self, object: &mut Map<String, Value>) -> Result<()> {
        let app_info = object
            .get("app_info")
            .and_then(Value::as_str)
            .ok_or_else(|| parse_error("missing `app_info`"))?;
        let app_info: Value = serde_json::from_str(app_info)
            .map_err(|e| parse_error(&format!("failed to parse `app_info`: {e}")))?;
        let app_info = app_info
            .as_object()
            .ok_or_else(|| parse_error("`app_info` is not an object"))?;

        if app_info.get("is_rpk").and_then(Value::as_str) != Some(RPK_MARKER) {
            return Ok(());
        }

        let res_type = app_info
            .get("res_type")
            .and_then(Value::as_str)
            .ok_or_else(|| parse_error("packaged resource without `res_type`"))?;
        let root = self
            .context
            .global_resource_path(res_type)
            .ok_or_else(|| parse_error(&format!("no global resource path for `{res_type}`")))?;
        let path = object
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| parse_error("packaged resource without `path`"))?;

        let resolved = format!("{}/{path}", root.display());
        debug!(res_type, %resolved, "resolved packaged resource path");
        object.insert("path".to_owned(), Value::String(resolved));
        Ok(())
    }
}

impl<P: PackageContext> PayloadRewriter for PackagedRewriter<P> {
    fn rewrite(&self, json: &str) -> Result<String> {
        if !self.context.is_packaged_app() {
            debug!("not a packaged application context");
            return Ok(json.to_owned());
        }

        let mut doc: Value = serde_json::from_str(json)
            .map_err(|e| parse_error(&format!("payload is not JSON: {e}")))?;

        let objects: Vec<&mut Map<String, Value>> = match &mut doc {
            Value::Array(items) => items
                .iter_mut()
                .map(|item| {
                    item.as_object_mut()
                        .ok_or_else(|| parse_error("array element is not an object"))
                })
                .collect::<Result<_>>()?,
            Value::Object(object) => vec![object],
            _ => return Err(parse_error("payload is neither an object nor an array")),
        };

        if objects.is_empty() {
            return Err(parse_error("no data found in payload"));
        }

        // One bad element fails the whole batch.
        for object in objects {
            self.resolve_object(object)?;
        }

        serde_json::to_string_pretty(&doc).map_err(|e| parse_error(&e.to_string()))
    }
}

/// Platform hook backed by the `[package]` configuration table.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredContext {
    package: PackageConfig,
}

impl ConfiguredContext {
    #[must_use]
    pub const fn new(package: PackageConfig) -> Self {
        Self { package }
    }
}

impl PackageContext for ConfiguredContext {
    fn is_packaged_app(&self) -> bool {
        self.package.app_id.is_some()
    }

    fn global_resource_path(&self, res_type: &str) -> Option<PathBuf> {
        self.package.resource_paths.get(res_type).cloned()
    }
}

/// Pick the rewriter the configuration asks for.
#[must_use]
pub fn rewriter_for(config: &Config) -> Box<dyn PayloadRewriter> {
    match &config.package {
        Some(package) => Box::new(PackagedRewriter::new(ConfiguredContext::new(package.clone()))),
        None => Box::new(IdentityRewriter),
    }
}

fn parse_error(message: &str) -> AgentError {
    warn!(message, "cannot rewrite payload");
    AgentError::Parse(message.to_owned())
}
