//! Error types for the pass-management crate.

use thiserror::Error;

use alsvid_ir::IrError;
use alsvid_sched::SchedError;

/// Errors from pass management and pass execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PassError {
    /// The strategy JSON violates the expected schema.
    #[error("strategy error at {path}: {reason}")]
    JsonShape {
        /// Dotted/indexed path of the offending value.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A pass type name is not registered with the factory.
    #[error("unknown pass type '{type_name}'")]
    UnknownPassType {
        /// The name that failed to resolve.
        type_name: String,
    },

    /// Two sibling passes share an instance name.
    #[error("duplicate pass instance name '{name}'")]
    DuplicateInstanceName {
        /// The duplicated name.
        name: String,
    },

    /// An instance name does not match `[A-Za-z0-9_\-]+`.
    #[error("invalid pass instance name '{name}'")]
    InvalidInstanceName {
        /// The offending name.
        name: String,
    },

    /// A dotted instance path does not resolve to a pass.
    #[error("no pass at path '{path}'")]
    PathNotFound {
        /// The path that failed to resolve.
        path: String,
    },

    /// A sub-pass operation targeted a pass that is not a group.
    #[error("pass '{path}' is not a group")]
    PassNotGroup {
        /// Path of the non-group pass.
        path: String,
    },

    /// A `set_option` with `must_exist` affected no pass.
    #[error("option path '{path}' matched no pass with that option")]
    OptionPathNotFound {
        /// The option path.
        path: String,
    },

    /// An option value failed validation.
    #[error("invalid value for option '{option}': {reason}")]
    OptionValueInvalid {
        /// The option name.
        option: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An option was set after the owning pass was constructed.
    #[error("option '{option}' cannot be set after construction")]
    OptionsFrozen {
        /// The option name.
        option: String,
    },

    /// A pass was cancelled; the program is unchanged.
    #[error("pass cancelled")]
    Cancelled,

    /// A pass failed; carries the failing pass path and the root cause.
    #[error("pass '{path}' failed")]
    InPass {
        /// Dotted instance path of the failing pass.
        path: String,
        /// The underlying failure.
        #[source]
        source: Box<PassError>,
    },

    /// IR-level failure surfaced by a pass.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Scheduling failure surfaced by a pass.
    #[error(transparent)]
    Sched(#[from] SchedError),
}

/// Result type for pass management.
pub type PassResult<T> = Result<T, PassError>;

/// Exit code for a pass-manager failure when driven by a CLI collaborator:
/// 64 for user configuration errors, 70 for internal errors.
pub fn exit_code(error: &PassError) -> i32 {
    match error {
        PassError::JsonShape { .. }
        | PassError::UnknownPassType { .. }
        | PassError::DuplicateInstanceName { .. }
        | PassError::InvalidInstanceName { .. }
        | PassError::PathNotFound { .. }
        | PassError::PassNotGroup { .. }
        | PassError::OptionPathNotFound { .. }
        | PassError::OptionValueInvalid { .. }
        | PassError::OptionsFrozen { .. } => 64,
        PassError::InPass { source, .. } => exit_code(source),
        _ => 70,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code(&PassError::UnknownPassType {
                type_name: "x".into()
            }),
            64
        );
        assert_eq!(exit_code(&PassError::Sched(SchedError::CycleOverflow)), 70);
        // The chain reports the root cause's class.
        let wrapped = PassError::InPass {
            path: "sch".into(),
            source: Box::new(PassError::OptionValueInvalid {
                option: "x".into(),
                reason: "nope".into(),
            }),
        };
        assert_eq!(exit_code(&wrapped), 64);
    }
}
