//! Error types for the common bookkeeping crate.

use thiserror::Error;

/// Errors from the bookkeeping structures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ComError {
    /// Every real qubit is already bound to a virtual qubit.
    #[error("no free real qubit left to allocate for virtual qubit {virt}")]
    OutOfRealQubits {
        /// The virtual qubit that could not be placed.
        virt: usize,
    },
}

/// Result type for bookkeeping operations.
pub type ComResult<T> = Result<T, ComError>;
