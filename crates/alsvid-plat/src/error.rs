//! Error types for the platform crate.

use thiserror::Error;

/// Errors that can occur while loading or querying a platform.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatError {
    /// A configuration tree violates the expected schema. Carries the JSON
    /// path of the offending value.
    #[error("configuration error at {path}: {reason}")]
    JsonShape {
        /// Dotted/indexed path of the offending value.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An instruction name was not found in the platform catalog.
    #[error("unknown instruction '{name}'")]
    UnknownInstruction {
        /// The name that failed to resolve.
        name: String,
    },
}

impl PlatError {
    /// Shorthand for a [`PlatError::JsonShape`] error.
    pub fn shape(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PlatError::JsonShape {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for platform operations.
pub type PlatResult<T> = Result<T, PlatError>;
