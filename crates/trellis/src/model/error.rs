//! Error types for the model layer.

use thiserror::Error;

/// Failure produced by a child or page loader callback.
///
/// Loader failures never unwind through the models: the tree model clears
/// the affected holder's loading flag and emits `load_failed`, and the paged
/// model clears its in-flight flag with items unchanged. Callers that want
/// retry behavior implement it in the loader itself or in response to the
/// `load_failed` signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The loader gave up or the backing source reported a failure.
    #[error("{0}")]
    Failed(String),
    /// The load was abandoned before completion (e.g. the source went away).
    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    /// Shorthand for a `Failed` value from any displayable cause.
    pub fn failed(cause: impl std::fmt::Display) -> Self {
        Self::Failed(cause.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        assert_eq!(LoadError::failed("timeout").to_string(), "timeout");
        assert_eq!(LoadError::Cancelled.to_string(), "load cancelled");
    }
}
