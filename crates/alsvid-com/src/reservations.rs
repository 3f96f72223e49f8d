//! Cycle-range reservation tracking.
//!
//! A [`Tracker`] holds a set of pairwise non-overlapping half-open cycle
//! ranges, each optionally mapping to a value. Resource models use trackers
//! to record when a machine resource is busy; [`Tracker::find`] classifies
//! how a query range relates to the existing reservations, and
//! [`Tracker::reserve`] claims a range, evicting whatever overlapped it.
//!
//! The tracker is an ordered map keyed on the range, so queries and
//! reservations are logarithmic in the number of stored ranges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A half-open range of cycles `[begin, end)`.
///
/// Stored ranges always satisfy `begin < end`. Ranges order
/// lexicographically by `(begin, end)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CycleRange {
    /// First cycle of the range (inclusive).
    pub begin: u64,
    /// End of the range (exclusive).
    pub end: u64,
}

impl CycleRange {
    /// Create a range. `end` must be greater than `begin`.
    pub fn new(begin: u64, end: u64) -> Self {
        debug_assert!(begin < end, "cycle range [{begin},{end}) is empty");
        Self { begin, end }
    }
}

impl fmt::Display for CycleRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.begin, self.end)
    }
}

/// How a query range relates to the existing reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// No overlap with any reservation.
    None,
    /// Overlaps part of a single reservation without containment either way.
    Partial,
    /// Overlaps two or more reservations.
    Multiple,
    /// A single reservation lies strictly inside the query.
    Super,
    /// The query lies strictly inside a single reservation.
    Sub,
    /// A reservation equals the query exactly.
    Exact,
}

/// Tracker for cycle-range reservations, mapping each range to a `V`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker<V = ()> {
    reservations: BTreeMap<CycleRange, V>,
}

impl<V> Default for Tracker<V> {
    fn default() -> Self {
        Self {
            reservations: BTreeMap::new(),
        }
    }
}

impl<V> Tracker<V> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations.
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// Whether no reservations are stored.
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Iterate over the reservations in range order.
    pub fn iter(&self) -> impl Iterator<Item = (CycleRange, &V)> {
        self.reservations.iter().map(|(k, v)| (*k, v))
    }

    /// Classify how `range` compares to the existing reservations. Where
    /// the classification identifies a single reservation (`Exact`, `Sub`,
    /// `Super`, `Partial`), that reservation is returned alongside.
    pub fn find(&self, range: CycleRange) -> (Overlap, Option<(CycleRange, &V)>) {
        debug_assert!(range.begin < range.end);

        if self.reservations.is_empty() {
            return (Overlap::None, None);
        }

        // The first reservation ordered at or after the query.
        let after = self.reservations.range(range..).next();

        let Some((&k, v)) = after else {
            // Nothing at or after the query; the last reservation starts
            // before it and may still overlap or contain it.
            let (&prev, pv) = self
                .reservations
                .iter()
                .next_back()
                .expect("tracker is non-empty");
            debug_assert!(prev.begin <= range.begin);
            if prev.end >= range.end {
                return (Overlap::Sub, Some((prev, pv)));
            }
            if prev.end > range.begin {
                return (Overlap::Partial, Some((prev, pv)));
            }
            return (Overlap::None, None);
        };

        if k == range {
            return (Overlap::Exact, Some((k, v)));
        }

        // k orders at or after the query, so k.begin >= range.begin.
        debug_assert!(k.begin >= range.begin);
        if k.end <= range.end {
            // The query envelops k; any second overlap upgrades to Multiple.
            if let Some((next, _)) = self
                .reservations
                .range((std::ops::Bound::Excluded(k), std::ops::Bound::Unbounded))
                .next()
            {
                if next.begin < range.end {
                    return (Overlap::Multiple, None);
                }
            }
            if let Some((prev, _)) = self.reservations.range(..k).next_back() {
                if prev.end > range.begin {
                    return (Overlap::Multiple, None);
                }
            }
            return (Overlap::Super, Some((k, v)));
        }

        // k ends after the query ends.
        if k.begin >= range.end {
            // k starts past the query; only the reservation before it can
            // overlap.
            let Some((&prev, pv)) = self.reservations.range(..k).next_back() else {
                return (Overlap::None, None);
            };
            debug_assert!(prev.begin <= range.begin);
            if prev.end >= range.end {
                return (Overlap::Sub, Some((prev, pv)));
            }
            if prev.end > range.begin {
                return (Overlap::Partial, Some((prev, pv)));
            }
            return (Overlap::None, None);
        }

        // k overlaps the tail of the query; a preceding overlap makes it
        // Multiple, otherwise this is a partial overlap with k.
        if let Some((prev, _)) = self.reservations.range(..k).next_back() {
            if prev.end > range.begin {
                return (Overlap::Multiple, None);
            }
        }
        (Overlap::Partial, Some((k, v)))
    }

    /// Make a reservation. Preexisting reservations overlapping `range` are
    /// removed first; when `replace_all` is set, every preexisting
    /// reservation is removed.
    pub fn reserve(&mut self, range: CycleRange, value: V, replace_all: bool) {
        debug_assert!(range.begin < range.end);

        if replace_all {
            self.reservations.clear();
            self.reservations.insert(range, value);
            return;
        }

        // Exact requested range: just replace the value.
        if let Some(v) = self.reservations.get_mut(&range) {
            *v = value;
            return;
        }

        // Evict everything that overlaps. Overlapping keys start before the
        // query's end; walking them backwards stops at the first reservation
        // ending at or before the query's begin (stored ranges are
        // disjoint, so ends decrease with begins).
        let probe = CycleRange {
            begin: range.end,
            end: 0,
        };
        let doomed: Vec<CycleRange> = self
            .reservations
            .range(..probe)
            .rev()
            .take_while(|(k, _)| k.end > range.begin)
            .map(|(k, _)| *k)
            .collect();
        for k in doomed {
            self.reservations.remove(&k);
        }

        self.reservations.insert(range, value);
    }

    /// Remove all reservations.
    pub fn reset(&mut self) {
        self.reservations.clear();
    }

    /// Dump the reservation state to a writer.
    pub fn dump_state(&self, w: &mut impl fmt::Write) -> fmt::Result
    where
        V: fmt::Debug,
    {
        if self.reservations.is_empty() {
            return writeln!(w, "no reservations");
        }
        for (k, v) in &self.reservations {
            writeln!(w, "{k} = {v:?}")?;
        }
        Ok(())
    }
}
