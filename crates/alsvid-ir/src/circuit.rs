//! Circuits: ordered gate sequences belonging to a single kernel.

use serde::{Deserialize, Serialize};

use crate::gate::{Cycle, Gate};

/// Ordered sequence of gates.
///
/// After scheduling, the sequence is kept sorted by cycle non-decreasing
/// (*cycles-valid*); gates sharing a cycle are simultaneous. The sort used
/// here is stable so that ties preserve program order, which is observable
/// through the schedulers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    gates: Vec<Gate>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a circuit from a gate sequence.
    pub fn from_gates(gates: impl IntoIterator<Item = Gate>) -> Self {
        Self {
            gates: gates.into_iter().collect(),
        }
    }

    /// Append a gate.
    pub fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// Number of gates.
    #[inline]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Whether the circuit has no gates.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Borrow the gate at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Gate> {
        self.gates.get(index)
    }

    /// Mutably borrow the gate at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Gate> {
        self.gates.get_mut(index)
    }

    /// Iterate over the gates in sequence order.
    pub fn iter(&self) -> std::slice::Iter<'_, Gate> {
        self.gates.iter()
    }

    /// Iterate mutably over the gates in sequence order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Gate> {
        self.gates.iter_mut()
    }

    /// Borrow the gates as a slice.
    pub fn as_slice(&self) -> &[Gate] {
        &self.gates
    }

    /// Stably sort the gates by cycle, non-decreasing. Unscheduled gates
    /// sort after all scheduled ones; ties keep their relative order.
    pub fn sort_by_cycle(&mut self) {
        self.gates
            .sort_by_key(|g| g.cycle.unwrap_or(Cycle::MAX));
    }

    /// Clear every gate's cycle assignment.
    pub fn clear_cycles(&mut self) {
        for gate in &mut self.gates {
            gate.cycle = None;
        }
    }

    /// The highest assigned cycle, if any gate is scheduled.
    pub fn max_cycle(&self) -> Option<Cycle> {
        self.gates.iter().filter_map(|g| g.cycle).max()
    }
}

impl<'a> IntoIterator for &'a Circuit {
    type Item = &'a Gate;
    type IntoIter = std::slice::Iter<'a, Gate>;

    fn into_iter(self) -> Self::IntoIter {
        self.gates.iter()
    }
}

impl<'a> IntoIterator for &'a mut Circuit {
    type Item = &'a mut Gate;
    type IntoIter = std::slice::IterMut<'a, Gate>;

    fn into_iter(self) -> Self::IntoIter {
        self.gates.iter_mut()
    }
}

impl FromIterator<Gate> for Circuit {
    fn from_iter<T: IntoIterator<Item = Gate>>(iter: T) -> Self {
        Self::from_gates(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_cycle_is_stable() {
        let mut c = Circuit::new();
        let mut a = Gate::quantum("a", [0], 20);
        a.cycle = Some(1);
        let mut b = Gate::quantum("b", [1], 20);
        b.cycle = Some(0);
        let mut d = Gate::quantum("d", [2], 20);
        d.cycle = Some(1);
        c.push(a);
        c.push(b);
        c.push(d);
        c.sort_by_cycle();
        let names: Vec<_> = c.iter().map(|g| g.name.as_str()).collect();
        // b first, then a before d (tie preserves program order).
        assert_eq!(names, ["b", "a", "d"]);
    }

    #[test]
    fn prop_sort_is_idempotent_and_ordered() {
        use proptest::prelude::*;

        proptest!(|(cycles in proptest::collection::vec(
            proptest::option::of(0u64..32), 0..24
        ))| {
            let mut c: Circuit = cycles
                .iter()
                .enumerate()
                .map(|(i, &cycle)| {
                    let mut g = Gate::quantum(format!("g{i}"), [0], 1);
                    g.cycle = cycle;
                    g
                })
                .collect();
            c.sort_by_cycle();
            let sorted: Vec<_> = c.iter().map(|g| g.cycle).collect();
            let mut again = c.clone();
            again.sort_by_cycle();
            prop_assert_eq!(
                sorted.clone(),
                again.iter().map(|g| g.cycle).collect::<Vec<_>>()
            );
            for w in c.as_slice().windows(2) {
                prop_assert!(
                    w[0].cycle.unwrap_or(u64::MAX) <= w[1].cycle.unwrap_or(u64::MAX)
                );
            }
        });
    }

    #[test]
    fn test_unscheduled_sorts_last() {
        let mut c = Circuit::new();
        let unscheduled = Gate::quantum("u", [0], 20);
        let mut scheduled = Gate::quantum("s", [1], 20);
        scheduled.cycle = Some(5);
        c.push(unscheduled);
        c.push(scheduled);
        c.sort_by_cycle();
        assert_eq!(c.get(0).unwrap().name, "s");
        assert_eq!(c.max_cycle(), Some(5));
    }
}
