//! Alsvid program intermediate representation.
//!
//! This crate provides the data structures the rest of the compilation stack
//! operates on: gates, circuits, kernels and programs, plus the structural
//! consistency checker.
//!
//! # Overview
//!
//! A [`Program`] is an ordered list of [`Kernel`]s; each kernel owns a
//! [`Circuit`], a flat ordered sequence of [`Gate`]s. Control flow between
//! kernels is expressed with marker kernels ([`KernelKind`]), so programs
//! stay flat and schedulers only ever see straight-line circuits.
//!
//! Gates carry their operands directly (qubit, classical-register and
//! bit-register indices), an optional conditional predicate, and the cycle
//! assigned by a scheduler — `None` until one has run.
//!
//! # Example
//!
//! ```rust
//! use alsvid_ir::{Gate, Kernel, Program};
//!
//! let mut kernel = Kernel::new("bell", 2, 2, 0);
//! kernel.push(Gate::quantum("h", [0], 40));
//! kernel.push(Gate::quantum("cnot", [0, 1], 80));
//!
//! let mut program = Program::new("demo", 2, 2, 0);
//! program.add_kernel(kernel).unwrap();
//! alsvid_ir::consistency::check_program(&program).unwrap();
//! ```

pub mod bundle;
pub mod circuit;
pub mod consistency;
pub mod error;
pub mod gate;
pub mod kernel;

pub use bundle::{Bundle, bundler, circuiter};
pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{Comparator, Condition, Cycle, Gate, GateKind};
pub use kernel::{Kernel, KernelKind, Program};
