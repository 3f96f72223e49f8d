//! Error types for the IR crate.

use thiserror::Error;

use crate::gate::Comparator;

/// Errors that can occur in IR operations and consistency checking.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit operand index exceeds the kernel's qubit count.
    #[error("qubit operand {qubit} out of range 0..{count} (gate '{gate}', kernel '{kernel}')")]
    QubitOutOfRange {
        /// The offending operand index.
        qubit: usize,
        /// The kernel's qubit count.
        count: usize,
        /// Name of the gate carrying the operand.
        gate: String,
        /// Name of the enclosing kernel.
        kernel: String,
    },

    /// Classical register operand index exceeds the kernel's register count.
    #[error("creg operand {creg} out of range 0..{count} (gate '{gate}', kernel '{kernel}')")]
    CregOutOfRange {
        /// The offending operand index.
        creg: usize,
        /// The kernel's classical register count.
        count: usize,
        /// Name of the gate carrying the operand.
        gate: String,
        /// Name of the enclosing kernel.
        kernel: String,
    },

    /// Bit register operand index exceeds the kernel's bit register count.
    #[error("breg operand {breg} out of range 0..{count} (gate '{gate}', kernel '{kernel}')")]
    BregOutOfRange {
        /// The offending operand index.
        breg: usize,
        /// The kernel's bit register count.
        count: usize,
        /// Name of the gate carrying the operand.
        gate: String,
        /// Name of the enclosing kernel.
        kernel: String,
    },

    /// The same qubit appears twice in one gate's operand list.
    #[error("duplicate qubit operand {qubit} (gate '{gate}', kernel '{kernel}')")]
    DuplicateQubit {
        /// The duplicated qubit index.
        qubit: usize,
        /// Name of the gate carrying the operand.
        gate: String,
        /// Name of the enclosing kernel.
        kernel: String,
    },

    /// A condition carries the wrong number of bit-register operands for its
    /// comparator.
    #[error(
        "condition {comparator:?} takes {expected} breg operand(s), got {got} (in '{context}')"
    )]
    ConditionArity {
        /// The comparator of the offending condition.
        comparator: Comparator,
        /// Operand count the comparator requires.
        expected: usize,
        /// Operand count actually present.
        got: usize,
        /// Gate or kernel name the condition is attached to.
        context: String,
    },

    /// A control-flow kernel kind that requires a predicate has none.
    #[error("kernel '{kernel}' of kind {kind} requires a control-flow condition")]
    MissingCondition {
        /// Name of the kernel.
        kernel: String,
        /// Human-readable kind name.
        kind: String,
    },

    /// A straight-line or for-loop kernel carries a predicate.
    #[error("kernel '{kernel}' of kind {kind} must not carry a control-flow condition")]
    UnexpectedCondition {
        /// Name of the kernel.
        kernel: String,
        /// Human-readable kind name.
        kind: String,
    },

    /// Control-flow marker kernels do not nest properly.
    #[error("unbalanced control flow at kernel '{kernel}': {detail}")]
    UnbalancedControlFlow {
        /// Name of the kernel where the imbalance was detected.
        kernel: String,
        /// What went wrong.
        detail: String,
    },

    /// A kernel claims valid cycles but contains an unscheduled gate.
    #[error("kernel '{kernel}' claims valid cycles but gate '{gate}' has no cycle")]
    CycleNotSet {
        /// Name of the enclosing kernel.
        kernel: String,
        /// Name of the unscheduled gate.
        gate: String,
    },

    /// A kernel claims valid cycles but its gates are not sorted by cycle.
    #[error(
        "kernel '{kernel}' claims valid cycles but gate '{gate}' at position {position} \
         precedes an earlier cycle"
    )]
    CyclesOutOfOrder {
        /// Name of the enclosing kernel.
        kernel: String,
        /// Name of the out-of-order gate.
        gate: String,
        /// Position of the gate within the circuit.
        position: usize,
    },

    /// Two kernels in one program share a name.
    #[error("duplicate kernel name '{name}' in program")]
    DuplicateKernelName {
        /// The duplicated name.
        name: String,
    },

    /// A kernel declares more registers than its program.
    #[error(
        "kernel '{kernel}' declares {declared} {register} register(s), \
         program allows {allowed}"
    )]
    RegisterCountExceeded {
        /// Name of the kernel.
        kernel: String,
        /// Register domain ("qubit", "creg" or "breg").
        register: &'static str,
        /// Count declared by the kernel.
        declared: usize,
        /// Count allowed by the program.
        allowed: usize,
    },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
