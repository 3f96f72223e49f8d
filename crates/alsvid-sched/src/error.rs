//! Error types for the scheduling crate.

use thiserror::Error;

/// Errors from dependency-graph construction and scheduling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedError {
    /// The dependency graph contains a cycle. Construction alone cannot
    /// produce one; this surfaces after external arcs were injected.
    #[error("dependency graph is not acyclic")]
    GraphNotAcyclic,

    /// The resource model never admitted any ready gate.
    #[error(
        "schedule is infeasible: {stalls} consecutive cycles passed without \
         scheduling a gate (limit {limit})"
    )]
    ScheduleInfeasible {
        /// Consecutive stalled cycles observed.
        stalls: u64,
        /// The stall bound that was exceeded.
        limit: u64,
    },

    /// Cycle arithmetic overflowed.
    #[error("cycle arithmetic overflow")]
    CycleOverflow,

    /// A gate operand index is outside the declared register space.
    #[error("{domain} operand {index} out of range 0..{count} (gate '{gate}')")]
    OperandOutOfRange {
        /// Operand domain ("qubit", "creg" or "breg").
        domain: &'static str,
        /// The offending operand index.
        index: usize,
        /// The declared register count.
        count: usize,
        /// Name of the gate carrying the operand.
        gate: String,
    },

    /// A gate has the wrong operand count for its signature.
    #[error("gate '{gate}' takes {expected} qubit operand(s), got {got}")]
    BadOperandCount {
        /// Name of the gate.
        gate: String,
        /// Operand count the signature requires.
        expected: usize,
        /// Operand count actually present.
        got: usize,
    },
}

/// Result type for scheduling operations.
pub type SchedResult<T> = Result<T, SchedError>;
