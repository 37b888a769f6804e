//! Errors raised on the request path.
//!
//! The gate adds no user-visible error categories of its own. These errors
//! are handed to the HTTP layer's generic error path through `Next`.

use crate::ids::UnitId;

/// Failure while handling a request through the gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// No watch process belongs to the unit that must be rebuilt.
    ///
    /// This is an integration bug: the modules just marked as needed would
    /// stay suspended with no way to complete.
    #[error("no active watch process for {unit}; cannot schedule a rebuild")]
    MissingWatcher { unit: UnitId },

    /// The unit's watch process exists but has no watcher to pause.
    #[error("watch process for {unit} has no watcher to pause")]
    WatcherDetached { unit: UnitId },

    /// The request URL could not be mapped to an artifact path.
    #[error("cannot resolve '{url}': {message}")]
    Resolve { url: String, message: String },
}

impl GateError {
    pub fn resolve(url: impl Into<String>, message: impl Into<String>) -> Self {
        GateError::Resolve {
            url: url.into(),
            message: message.into(),
        }
    }
}

pub type GateResult<T> = Result<T, GateError>;
