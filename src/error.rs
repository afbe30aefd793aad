//! Error kinds surfaced by the timer core.
//!
//! Every error is local to the operation that raised it: the session state is
//! left exactly as it was before the call.

use crate::session::Phase;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A comparison row could not be parsed into `(name, seconds)`.
    #[error("malformed data in '{key}' at line {line}: {reason}")]
    MalformedData {
        key: String,
        line: usize,
        reason: String,
    },

    /// The requested comparison key is not listed in the index.
    #[error("comparison '{0}' not found")]
    NotFound(String),

    /// Operation is not allowed in the current phase.
    #[error("{op} not allowed while {phase}")]
    IllegalState { op: &'static str, phase: Phase },

    /// The catalog source could not be reached or read.
    #[error("source unavailable for '{key}': {reason}")]
    Unavailable { key: String, reason: String },

    /// Writing the export artifact failed.
    #[error("export to '{path}' failed: {reason}")]
    Export { path: String, reason: String },
}

impl SessionError {
    pub fn illegal(op: &'static str, phase: Phase) -> Self {
        SessionError::IllegalState { op, phase }
    }

    pub fn malformed(key: &str, line: usize, reason: impl Into<String>) -> Self {
        SessionError::MalformedData {
            key: key.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Short machine tag used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::MalformedData { .. } => "malformed_data",
            SessionError::NotFound(_) => "not_found",
            SessionError::IllegalState { .. } => "illegal_state",
            SessionError::Unavailable { .. } => "unavailable",
            SessionError::Export { .. } => "export",
        }
    }
}
