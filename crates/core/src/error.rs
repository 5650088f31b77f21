//! Error taxonomy surfaced to callers and its mapping onto negative errno codes.

use std::io;

use crate::ServiceKind;

pub const EIO: i32 = 5;
pub const EINVAL: i32 = 22;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Caller error; no remote interaction was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("no bus scope has a reachable {0} service")]
    Unavailable(ServiceKind),
    /// The daemon answered with a non-zero result code.
    #[error("daemon rejected the call with code {0}")]
    Rejected(i32),
    #[error("transport: {0}")]
    Transport(#[from] io::Error),
    #[error("payload: {0}")]
    Parse(String),
}

impl AgentError {
    /// Integer status handed to C callers. Always negative.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => -EINVAL,
            Self::Unavailable(_) | Self::Transport(_) | Self::Parse(_) => -EIO,
            Self::Rejected(code) => match *code {
                0 => -EIO,
                c if c > 0 => -c,
                c => c,
            },
        }
    }
}

/// Fold the transport flag and the daemon's result code into one outcome.
///
/// Success needs both signals. A non-zero code wins over the transport flag;
/// a failed transport with no code is reported as an I/O failure.
///
/// # Errors
///
/// Returns `Rejected` for a non-zero `code`, `Transport` when `delivered`
/// is false and `code` is zero.
pub fn reconcile(delivered: bool, code: i32) -> Result<()> {
    match (delivered, code) {
        (true, 0) => Ok(()),
        (false, 0) => Err(AgentError::Transport(io::Error::other(
            "call failed without a result code",
        ))),
        (_, code) => Err(AgentError::Rejected(code)),
    }
}
