//! Alsvid common compiler bookkeeping.
//!
//! Two small stateful structures shared by the scheduling and mapping
//! layers:
//!
//! - [`Tracker`]: a set of non-overlapping half-open cycle ranges with an
//!   optional value per range, used by resource models to record when a
//!   machine resource is busy.
//! - [`QubitMap`]: the per-kernel virtual-to-real qubit mapping with
//!   per-real residency state, used by mapping passes.

pub mod error;
pub mod mapping;
pub mod reservations;

pub use error::{ComError, ComResult};
pub use mapping::{PlacementOutcome, QubitMap, ResidencyState};
pub use reservations::{CycleRange, Overlap, Tracker};
