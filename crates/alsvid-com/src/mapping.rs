//! Virtual-to-real qubit mapping state.
//!
//! While mapping a kernel, each virtual qubit that is in use resides on
//! some real qubit, and each real qubit carries a residency state telling
//! whether its contents must be preserved. The map is the dynamic state a
//! mapping pass threads from kernel to kernel; the topology and the real
//! qubit count stay fixed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ComError, ComResult};

/// What a real qubit currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidencyState {
    /// Garbage; nothing worth preserving.
    NoState,
    /// A known initialized state, suitable for replacing a swap by a move.
    WasInited,
    /// A unique state that must be preserved.
    HasState,
}

/// Outcome of an external initial-placement solve.
///
/// The solver runs outside the core (possibly on a worker with a timeout);
/// the core only consumes its typed result. On cancellation or failure the
/// caller keeps its pre-call mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    /// The solver found a placement; adopt this mapping.
    NewMapping(QubitMap),
    /// The current mapping is already optimal; keep it.
    Unchanged,
    /// The solver ran out of time; keep the pre-call mapping.
    TimedOut,
    /// The solver failed; keep the pre-call mapping.
    Failed,
}

/// Map from virtual qubit indices to real qubit indices, plus per-real
/// residency state.
///
/// The restriction of the map to bound virtual qubits is injective: no two
/// virtual qubits share a real one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QubitMap {
    v2r: Vec<Option<usize>>,
    rs: Vec<ResidencyState>,
}

impl QubitMap {
    /// Create a map over `n` qubits.
    ///
    /// With `one_to_one`, virtual qubit `i` starts bound to real qubit `i`;
    /// otherwise all virtual qubits start unbound and are placed on demand.
    /// With `assume_initialized`, all real qubits start in the
    /// [`WasInited`](ResidencyState::WasInited) state; otherwise they start
    /// as garbage.
    pub fn new(n: usize, one_to_one: bool, assume_initialized: bool) -> Self {
        let v2r = if one_to_one {
            (0..n).map(Some).collect()
        } else {
            vec![None; n]
        };
        let rs = vec![
            if assume_initialized {
                ResidencyState::WasInited
            } else {
                ResidencyState::NoState
            };
            n
        ];
        Self { v2r, rs }
    }

    /// Number of qubits the map covers.
    #[inline]
    pub fn len(&self) -> usize {
        self.v2r.len()
    }

    /// Whether the map covers no qubits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.v2r.is_empty()
    }

    /// The real qubit a virtual qubit is bound to, if any.
    #[inline]
    pub fn real_of(&self, virt: usize) -> Option<usize> {
        self.v2r[virt]
    }

    /// Bind or unbind a virtual qubit directly.
    pub fn set_real_of(&mut self, virt: usize, real: Option<usize>) {
        self.v2r[virt] = real;
    }

    /// Reverse lookup: the virtual qubit bound to a real qubit, if any.
    /// Linear in the map size.
    pub fn virt_of(&self, real: usize) -> Option<usize> {
        self.v2r.iter().position(|&r| r == Some(real))
    }

    /// Residency state of a real qubit.
    #[inline]
    pub fn residency(&self, real: usize) -> ResidencyState {
        self.rs[real]
    }

    /// Set the residency state of a real qubit.
    pub fn set_residency(&mut self, real: usize, state: ResidencyState) {
        self.rs[real] = state;
    }

    /// Bind an unbound virtual qubit to any free real qubit, returning the
    /// chosen real index.
    pub fn alloc(&mut self, virt: usize) -> ComResult<usize> {
        debug_assert!(self.v2r[virt].is_none(), "virtual qubit {virt} already bound");
        for real in 0..self.len() {
            if self.virt_of(real).is_none() {
                debug_assert!(self.rs[real] != ResidencyState::HasState);
                self.v2r[virt] = Some(real);
                return Ok(real);
            }
        }
        Err(ComError::OutOfRealQubits { virt })
    }

    /// Reflect the execution of a swap between real qubits `r0` and `r1`:
    /// the virtual qubits bound to them trade places, and so do the
    /// residency states.
    pub fn swap(&mut self, r0: usize, r1: usize) {
        debug_assert!(r0 != r1);
        let v0 = self.virt_of(r0);
        let v1 = self.virt_of(r1);

        match v0 {
            Some(v0) => self.v2r[v0] = Some(r1),
            None => debug_assert!(self.rs[r0] != ResidencyState::HasState),
        }
        match v1 {
            Some(v1) => self.v2r[v1] = Some(r0),
            None => debug_assert!(self.rs[r1] != ResidencyState::HasState),
        }

        self.rs.swap(r0, r1);
    }

    /// Export the forward map as a vector of real indices (or `None`).
    pub fn v2r(&self) -> &[Option<usize>] {
        &self.v2r
    }

    /// Export the residency states.
    pub fn residencies(&self) -> &[ResidencyState] {
        &self.rs
    }
}

impl fmt::Display for QubitMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (v, r) in self.v2r.iter().enumerate() {
            match r {
                Some(r) => write!(f, " (v{v}->r{r})")?,
                None => write!(f, " (v{v}->?)")?,
            }
        }
        for (r, s) in self.rs.iter().enumerate() {
            let tag = match s {
                ResidencyState::NoState => "no",
                ResidencyState::WasInited => "in",
                ResidencyState::HasState => "st",
            };
            write!(f, " (r{r}:{tag})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_injective(map: &QubitMap) {
        for v0 in 0..map.len() {
            for v1 in (v0 + 1)..map.len() {
                if let (Some(r0), Some(r1)) = (map.real_of(v0), map.real_of(v1)) {
                    assert_ne!(r0, r1, "v{v0} and v{v1} share r{r0}");
                }
            }
        }
    }

    #[test]
    fn test_one_to_one_init() {
        let map = QubitMap::new(3, true, true);
        assert_eq!(map.real_of(2), Some(2));
        assert_eq!(map.virt_of(1), Some(1));
        assert_eq!(map.residency(0), ResidencyState::WasInited);
    }

    #[test]
    fn test_on_demand_alloc() {
        let mut map = QubitMap::new(2, false, false);
        assert_eq!(map.real_of(0), None);
        let r0 = map.alloc(0).unwrap();
        let r1 = map.alloc(1).unwrap();
        assert_ne!(r0, r1);
        assert_injective(&map);
    }

    #[test]
    fn test_alloc_reuses_freed_real() {
        let mut map = QubitMap::new(2, false, false);
        let r0 = map.alloc(0).unwrap();
        map.alloc(1).unwrap();
        map.set_real_of(0, None);
        assert_eq!(map.alloc(0).unwrap(), r0);
        assert_injective(&map);
    }

    #[test]
    fn test_swap_moves_state() {
        let mut map = QubitMap::new(3, false, true);
        map.alloc(0).unwrap();
        map.set_residency(0, ResidencyState::HasState);
        // v0 on r0 with state; r1 free and inited.
        map.swap(0, 1);
        assert_eq!(map.real_of(0), Some(1));
        assert_eq!(map.residency(1), ResidencyState::HasState);
        assert_eq!(map.residency(0), ResidencyState::WasInited);
        assert_injective(&map);
    }

    #[test]
    fn test_swap_two_bound() {
        let mut map = QubitMap::new(2, true, false);
        map.set_residency(0, ResidencyState::HasState);
        map.swap(0, 1);
        assert_eq!(map.real_of(0), Some(1));
        assert_eq!(map.real_of(1), Some(0));
        assert_eq!(map.residency(1), ResidencyState::HasState);
        assert_injective(&map);
    }

    proptest! {
        /// Injectivity survives arbitrary alloc/swap sequences.
        #[test]
        fn prop_mapping_stays_injective(
            ops in prop::collection::vec((any::<bool>(), 0usize..6, 0usize..6), 0..40)
        ) {
            let mut map = QubitMap::new(6, false, true);
            for (is_swap, a, b) in ops {
                if is_swap {
                    if a != b {
                        map.swap(a, b);
                    }
                } else if map.real_of(a).is_none() {
                    map.alloc(a).unwrap();
                }
            }
            for v0 in 0..map.len() {
                for v1 in (v0 + 1)..map.len() {
                    if let (Some(r0), Some(r1)) = (map.real_of(v0), map.real_of(v1)) {
                        prop_assert_ne!(r0, r1);
                    }
                }
            }
        }
    }
}
