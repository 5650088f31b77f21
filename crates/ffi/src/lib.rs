//! C-callable `ml_agent_*` entry points.
//!
//! Every function returns 0 on success or a negative errno-style code
//! (`-EINVAL` for bad arguments, `-EIO` when no endpoint is reachable or the
//! call fails, or the daemon's own negative code). Out-pointers are written
//! only on success. Strings handed back through them belong to the caller and
//! must be released with [`ml_agent_free`].

use std::ffi::{c_char, c_int, CStr, CString};
use std::io;
use std::sync::{Once, OnceLock};

use mlagent_client::Agent;
use mlagent_core::{AgentError, Config, Result};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Process-wide agent, or the reason the configuration was unusable.
/// Holds only configuration, never a connection.
static AGENT: OnceLock<std::result::Result<Agent, String>> = OnceLock::new();
static LOG_INIT: Once = Once::new();

fn build_agent(config: eyre::Result<Config>) -> std::result::Result<Agent, String> {
    config.map(|config| Agent::from_config(&config)).map_err(|e| {
        warn!(%e, "client configuration unusable");
        e.to_string()
    })
}

fn loaded(slot: &std::result::Result<Agent, String>) -> Result<&Agent> {
    slot.as_ref()
        .map_err(|e| AgentError::Transport(io::Error::other(format!("configuration: {e}"))))
}

/// Fails with `-EIO` for every call once the configuration failed to load.
fn agent() -> Result<&'static Agent> {
    loaded(AGENT.get_or_init(|| build_agent(Config::load_or_default())))
}

fn status(result: Result<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            debug!(%e, code = e.code(), "ml_agent call failed");
            e.code()
        }
    }
}

/// Borrow a required C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn required<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(AgentError::InvalidArgument(what));
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let s = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| AgentError::InvalidArgument(what))?;
    if s.is_empty() {
        return Err(AgentError::InvalidArgument(what));
    }
    Ok(s)
}

/// Borrow an optional C string; null means absent.
///
/// # Safety
///
/// Same contract as [`required`].
unsafe fn optional<'a>(ptr: *const c_char, what: &'static str) -> Result<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(Some)
        .map_err(|_| AgentError::InvalidArgument(what))
}

/// # Safety
///
/// `ptr` must be null or valid for writes of `T`.
unsafe fn out<'a, T>(ptr: *mut T, what: &'static str) -> Result<&'a mut T> {
    // SAFETY: null is rejected; otherwise valid per the caller's contract.
    unsafe { ptr.as_mut() }.ok_or(AgentError::InvalidArgument(what))
}

/// Version 0 is never assigned; checked here so it is reported before
/// a configuration failure.
fn version(version: u32) -> Result<u32> {
    if version == 0 {
        return Err(AgentError::InvalidArgument("version"));
    }
    Ok(version)
}

/// Hand `value` to C; ownership passes to the caller.
fn hand_off(slot: &mut *mut c_char, value: String) -> Result<()> {
    let value = CString::new(value)
        .map_err(|_| AgentError::Parse("payload contains an interior NUL".to_owned()))?;
    *slot = value.into_raw();
    Ok(())
}

/// Install a stderr logger filtered by `MLAGENT_LOG` (default `warn`).
/// Calling it again is a no-op.
#[unsafe(no_mangle)]
pub extern "C" fn ml_agent_log_init() {
    LOG_INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("MLAGENT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    });
}

/// Release a string returned by any `ml_agent_*` function. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously handed out by this library and
/// not yet released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: produced by `CString::into_raw` in `hand_off`.
        drop(unsafe { CString::from_raw(ptr) });
    }
}

// ─── Pipeline ───────────────────────────────────────────────────────────────

/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_pipeline_set_description(
    name: *const c_char,
    pipeline_desc: *const c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let desc = unsafe { required(pipeline_desc, "pipeline_desc") }?;
        agent()?.pipeline_set_description(name, desc)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated; `pipeline_desc` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_pipeline_get_description(
    name: *const c_char,
    pipeline_desc: *mut *mut c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let slot = unsafe { out(pipeline_desc, "pipeline_desc") }?;
        let desc = agent()?.pipeline_get_description(name)?;
        hand_off(slot, desc)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_pipeline_delete(name: *const c_char) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        agent()?.pipeline_delete(name)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated; `id` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_pipeline_launch(name: *const c_char, id: *mut i64) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let slot = unsafe { out(id, "id") }?;
        *slot = agent()?.pipeline_launch(name)?;
        Ok(())
    })())
}

#[unsafe(no_mangle)]
pub extern "C" fn ml_agent_pipeline_start(id: i64) -> c_int {
    status(agent().and_then(|agent| agent.pipeline_start(id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn ml_agent_pipeline_stop(id: i64) -> c_int {
    status(agent().and_then(|agent| agent.pipeline_stop(id)))
}

#[unsafe(no_mangle)]
pub extern "C" fn ml_agent_pipeline_destroy(id: i64) -> c_int {
    status(agent().and_then(|agent| agent.pipeline_destroy(id)))
}

/// # Safety
///
/// `state` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_pipeline_get_state(id: i64, state: *mut c_int) -> c_int {
    status((|| -> Result<()> {
        let slot = unsafe { out(state, "state") }?;
        *slot = agent()?.pipeline_get_state(id)?;
        Ok(())
    })())
}

// ─── Model ──────────────────────────────────────────────────────────────────

/// # Safety
///
/// String arguments must be null or NUL-terminated; `version` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_register(
    name: *const c_char,
    path: *const c_char,
    activate: c_int,
    description: *const c_char,
    app_info: *const c_char,
    version: *mut u32,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let path = unsafe { required(path, "path") }?;
        let description = unsafe { optional(description, "description") }?;
        let app_info = unsafe { optional(app_info, "app_info") }?;
        let slot = unsafe { out(version, "version") }?;
        *slot = agent()?.model_register(name, path, activate != 0, description, app_info)?;
        Ok(())
    })())
}

/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_update_description(
    name: *const c_char,
    version: u32,
    description: *const c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let description = unsafe { required(description, "description") }?;
        let version = self::version(version)?;
        agent()?.model_update_description(name, version, description)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_activate(name: *const c_char, version: u32) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let version = self::version(version)?;
        agent()?.model_activate(name, version)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated; `model_info` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_get(
    name: *const c_char,
    version: u32,
    model_info: *mut *mut c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let slot = unsafe { out(model_info, "model_info") }?;
        let version = self::version(version)?;
        let info = agent()?.model_get(name, version)?;
        hand_off(slot, info)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated; `model_info` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_get_activated(
    name: *const c_char,
    model_info: *mut *mut c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let slot = unsafe { out(model_info, "model_info") }?;
        let info = agent()?.model_get_activated(name)?;
        hand_off(slot, info)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated; `model_info` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_get_all(
    name: *const c_char,
    model_info: *mut *mut c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let slot = unsafe { out(model_info, "model_info") }?;
        let info = agent()?.model_get_all(name)?;
        hand_off(slot, info)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_model_delete(
    name: *const c_char,
    version: u32,
    force: c_int,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        agent()?.model_delete(name, version, force != 0)
    })())
}

// ─── Resource ───────────────────────────────────────────────────────────────

/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_resource_add(
    name: *const c_char,
    path: *const c_char,
    description: *const c_char,
    app_info: *const c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let path = unsafe { required(path, "path") }?;
        let description = unsafe { optional(description, "description") }?;
        let app_info = unsafe { optional(app_info, "app_info") }?;
        agent()?.resource_add(name, path, description, app_info)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_resource_delete(name: *const c_char) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        agent()?.resource_delete(name)
    })())
}

/// # Safety
///
/// `name` must be null or NUL-terminated; `res_info` null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ml_agent_resource_get(
    name: *const c_char,
    res_info: *mut *mut c_char,
) -> c_int {
    status((|| -> Result<()> {
        let name = unsafe { required(name, "name") }?;
        let slot = unsafe { out(res_info, "res_info") }?;
        let info = agent()?.resource_get(name)?;
        hand_off(slot, info)
    })())
}
