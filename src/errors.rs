//! Structured error types for the maintenance engine
//!
//! Checks return these instead of blanket-catching; the cycle aggregates the
//! per-check results and decides what to log. Nothing here is ever allowed to
//! crash the host process.

use std::fmt;

/// Maintenance error types with proper categorization
#[derive(Debug)]
pub enum MaintenanceError {
    /// A key-value read or write failed
    Store { key: String, reason: String },

    /// A stored value could not be serialized or deserialized
    Serialization { key: String, reason: String },

    /// A user record or content sequence has the wrong shape
    CorruptUser { username: String, reason: String },

    /// The storage capacity probe reported an error
    ProbeFailed(String),

    /// The storage capacity probe did not answer within the bounded timeout
    ProbeTimeout { waited_secs: u64 },

    /// Generic wrapper for errors bubbling up from the store accessor
    Internal(anyhow::Error),
}

impl MaintenanceError {
    /// Machine-readable error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store { .. } => "STORE_ERROR",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::CorruptUser { .. } => "CORRUPT_USER",
            Self::ProbeFailed(_) => "PROBE_FAILED",
            Self::ProbeTimeout { .. } => "PROBE_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::Store { key, reason } => format!("store error on key '{key}': {reason}"),
            Self::Serialization { key, reason } => {
                format!("serialization error on key '{key}': {reason}")
            }
            Self::CorruptUser { username, reason } => {
                format!("corrupt data for user '{username}': {reason}")
            }
            Self::ProbeFailed(reason) => format!("storage capacity probe failed: {reason}"),
            Self::ProbeTimeout { waited_secs } => {
                format!("storage capacity probe timed out after {waited_secs}s")
            }
            Self::Internal(err) => format!("internal error: {err}"),
        }
    }
}

impl fmt::Display for MaintenanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MaintenanceError {}

impl From<anyhow::Error> for MaintenanceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Type alias for Results using MaintenanceError
pub type Result<T> = std::result::Result<T, MaintenanceError>;
