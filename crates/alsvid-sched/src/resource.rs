//! The resource-manager interface and the default qubit-busy model.
//!
//! The scheduler treats machine resources abstractly: a resource manager
//! answers whether a gate may start at a cycle and records the claim when
//! the scheduler commits it. `available` must be pure with respect to the
//! manager's state; `reserve` is the only mutator, called exactly once per
//! non-exempt gate. A manager is constructed (or reset) fresh for every
//! schedule invocation.

use std::fmt;

use alsvid_ir::{Cycle, Gate};
use alsvid_com::{CycleRange, Overlap, Tracker};

/// Machine-resource reservations consulted by the list scheduler.
pub trait ResourceManager {
    /// Clear all reservations; called before each schedule.
    fn reset(&mut self);

    /// Whether `gate` may start at `cycle`. Pure query.
    fn available(&self, cycle: Cycle, gate: &Gate) -> bool;

    /// Commit `gate` starting at `cycle`.
    fn reserve(&mut self, cycle: Cycle, gate: &Gate);

    /// Dump the reservation state, for diagnostics.
    fn dump_state(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        let _ = w;
        Ok(())
    }
}

/// The baseline resource model: a qubit executes at most one gate at a
/// time. One reservation tracker per qubit records the busy ranges
/// `[cycle, cycle + duration)`.
#[derive(Debug, Clone)]
pub struct QubitBusyModel {
    cycle_time: u64,
    trackers: Vec<Tracker<()>>,
}

impl QubitBusyModel {
    /// Create the model for a platform with `qubit_count` qubits.
    pub fn new(qubit_count: usize, cycle_time: u64) -> Self {
        debug_assert!(cycle_time > 0);
        Self {
            cycle_time,
            trackers: vec![Tracker::new(); qubit_count],
        }
    }

    fn busy_range(&self, cycle: Cycle, gate: &Gate) -> Option<CycleRange> {
        let duration = gate.duration_cycles(self.cycle_time);
        if duration == 0 {
            return None;
        }
        Some(CycleRange::new(cycle, cycle + duration))
    }
}

impl ResourceManager for QubitBusyModel {
    fn reset(&mut self) {
        for tracker in &mut self.trackers {
            tracker.reset();
        }
    }

    fn available(&self, cycle: Cycle, gate: &Gate) -> bool {
        let Some(range) = self.busy_range(cycle, gate) else {
            return true;
        };
        gate.qubits.iter().all(|&q| {
            self.trackers
                .get(q)
                .is_none_or(|t| t.find(range).0 == Overlap::None)
        })
    }

    fn reserve(&mut self, cycle: Cycle, gate: &Gate) {
        let Some(range) = self.busy_range(cycle, gate) else {
            return;
        };
        for &q in &gate.qubits {
            if let Some(tracker) = self.trackers.get_mut(q) {
                tracker.reserve(range, (), false);
            }
        }
    }

    fn dump_state(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        for (q, tracker) in self.trackers.iter().enumerate() {
            if !tracker.is_empty() {
                write!(w, "qubit {q}: ")?;
                let mut s = String::new();
                tracker.dump_state(&mut s)?;
                w.write_str(&s)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::Gate;

    #[test]
    fn test_qubit_busy_conflict() {
        let mut rm = QubitBusyModel::new(2, 1);
        let g0 = Gate::quantum("x", [0], 3);
        assert!(rm.available(0, &g0));
        rm.reserve(0, &g0);
        // Overlapping use of q0 is denied until the gate completes.
        assert!(!rm.available(0, &g0));
        assert!(!rm.available(2, &g0));
        assert!(rm.available(3, &g0));
        // q1 is unaffected.
        let g1 = Gate::quantum("x", [1], 3);
        assert!(rm.available(0, &g1));
    }

    #[test]
    fn test_two_qubit_gate_claims_both() {
        let mut rm = QubitBusyModel::new(3, 1);
        let cz = Gate::quantum("cz", [0, 1], 2);
        rm.reserve(0, &cz);
        assert!(!rm.available(1, &Gate::quantum("x", [1], 1)));
        assert!(rm.available(1, &Gate::quantum("x", [2], 1)));
    }

    #[test]
    fn test_zero_duration_is_free() {
        let mut rm = QubitBusyModel::new(1, 1);
        rm.reserve(0, &Gate::quantum("x", [0], 5));
        let marker = Gate::quantum("mark", [0], 0);
        assert!(rm.available(0, &marker));
        rm.reserve(0, &marker);
        assert!(!rm.available(4, &Gate::quantum("x", [0], 1)));
    }

    #[test]
    fn test_reset_clears_reservations() {
        let mut rm = QubitBusyModel::new(1, 1);
        let g = Gate::quantum("x", [0], 2);
        rm.reserve(0, &g);
        rm.reset();
        assert!(rm.available(0, &g));
    }
}
