//! Alsvid platform model.
//!
//! The platform describes the target hardware and is immutable after load:
//! the qubit [`Topology`] (grid form, connectivity, multi-core partitioning
//! and derived distances), the [`InstructionSet`] catalog of instruction
//! types with their durations, and the cycle time that converts durations
//! into schedule cycles.
//!
//! The topology subset of the platform configuration is read from a JSON
//! tree; see [`Topology::from_json`] for the schema. Shape violations are
//! reported as [`PlatError::JsonShape`] with the offending JSON path.

pub mod error;
pub mod instruction;
pub mod platform;
pub mod topology;

pub use error::{PlatError, PlatResult};
pub use instruction::{InstructionSet, InstructionType};
pub use platform::Platform;
pub use topology::{Connectivity, Coordinate, GridForm, Topology};
