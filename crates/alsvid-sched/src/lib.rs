//! Alsvid dependency graphs and cycle schedulers.
//!
//! This crate turns one kernel's gate sequence into a typed dependency
//! graph and assigns a cycle to every gate:
//!
//! - [`DependencyGraph`]: event-driven construction encoding quantum
//!   commutation semantics (X/Z rotation classes, commuting reads) on top
//!   of classical read/write hazards, with synthetic SOURCE/SINK nodes.
//! - [`schedule_asap`] / [`schedule_alap`] / [`schedule_uniform`]:
//!   unconstrained critical-path schedulers.
//! - [`schedule_rc`]: the resource-constrained list scheduler, driven by a
//!   [`ResourceManager`].
//! - [`schedule_kernel`]: the kernel-level entry point combining the
//!   above.
//!
//! # Example
//!
//! ```rust
//! use alsvid_ir::{Gate, Kernel};
//! use alsvid_sched::{CommuteOptions, SchedulerTarget, schedule_kernel};
//!
//! let mut kernel = Kernel::new("demo", 2, 0, 0);
//! kernel.push(Gate::quantum("h", [0], 2));
//! kernel.push(Gate::quantum("cnot", [0, 1], 4));
//!
//! let depth = schedule_kernel(
//!     &mut kernel,
//!     2,
//!     SchedulerTarget::Asap,
//!     CommuteOptions::default(),
//!     None,
//! )
//! .unwrap();
//! assert_eq!(depth, 3);
//! ```

pub mod error;
pub mod graph;
pub mod resource;
pub mod schedule;

pub use error::{SchedError, SchedResult};
pub use graph::{
    CommuteOptions, DepEdge, DepKind, DependencyGraph, NodeData, NodeIndex, NodeKind, OperandKind,
};
pub use resource::{QubitBusyModel, ResourceManager};
pub use schedule::{
    Direction, SchedulerTarget, schedule_alap, schedule_asap, schedule_kernel, schedule_rc,
    schedule_uniform,
};
