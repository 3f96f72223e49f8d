//! Qubit topology: grid form, connectivity, cores and distances.
//!
//! The topology is fixed per platform and immutable after load. It supports
//! navigation queries for the mapping and scheduling layers: neighbor lists
//! (sorted clockwise when an underlying XY grid exists), all-pairs hop
//! distances, and the multi-core partitioning with its communication
//! qubits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{PlatError, PlatResult};

/// Sentinel distance for unreachable qubit pairs.
const UNREACHABLE: u64 = u64::MAX;

/// Qubit grid form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridForm {
    /// Qubits have integer X/Y coordinates associated with them.
    Xy,
    /// Qubits have no coordinates.
    Irregular,
}

/// Qubit connectivity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    /// Connectivity is enumerated by the `edges` section.
    Specified,
    /// Full connectivity; between cores only communication qubits connect.
    Full,
}

/// An integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Horizontal position.
    pub x: i64,
    /// Vertical position.
    pub y: i64,
}

/// The qubit grid of a platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    num_qubits: usize,
    num_cores: usize,
    comm_qubits_per_core: usize,
    form: GridForm,
    xy_size: Option<Coordinate>,
    coords: Vec<Option<Coordinate>>,
    connectivity: Connectivity,
    neighbors: Vec<Vec<usize>>,
    /// Floyd-Warshall matrix; empty for full connectivity (analytic there).
    distances: Vec<Vec<u64>>,
    /// Edge (src, dst) to edge id, when edges are enumerated.
    edge_ids: BTreeMap<(usize, usize), u64>,
}

impl Topology {
    /// Build a topology for `num_qubits` qubits from its JSON description.
    ///
    /// Schema (unknown keys are ignored):
    ///
    /// ```json
    /// {
    ///     "form": "xy" | "irregular",
    ///     "x_size": <int>, "y_size": <int>,          // xy only
    ///     "qubits": [ {"id": 0, "x": 0, "y": 0} ],   // xy only
    ///     "number_of_cores": <positive int>,
    ///     "comm_qubits_per_core": <positive int>,
    ///     "connectivity": "specified" | "full",
    ///     "edges": [ {"src": 0, "dst": 1, "id": 5} ] // specified only
    /// }
    /// ```
    ///
    /// When `form` is omitted it is inferred from the presence of `qubits`;
    /// when `connectivity` is omitted it is inferred from the presence of
    /// `edges`. Edge ids default to `src * num_qubits + dst`.
    pub fn from_json(num_qubits: usize, config: &Value) -> PlatResult<Self> {
        let obj = config
            .as_object()
            .ok_or_else(|| PlatError::shape("topology", "expected an object"))?;
        if num_qubits == 0 {
            return Err(PlatError::shape("topology", "qubit count must be positive"));
        }

        // Grid form, inferred from the qubit coordinate list when absent.
        let form = match obj.get("form") {
            None => {
                if obj.contains_key("qubits") {
                    GridForm::Xy
                } else {
                    GridForm::Irregular
                }
            }
            Some(Value::String(s)) if s == "xy" => GridForm::Xy,
            Some(Value::String(s)) if s == "irregular" => GridForm::Irregular,
            Some(Value::String(s)) => {
                return Err(PlatError::shape(
                    "topology.form",
                    format!("unsupported form '{s}'"),
                ));
            }
            Some(_) => return Err(PlatError::shape("topology.form", "expected a string")),
        };

        // Multi-core attributes.
        let num_cores = match obj.get("number_of_cores") {
            None => 1,
            Some(v) => usize_field(v, "topology.number_of_cores")?,
        };
        if num_cores == 0 {
            return Err(PlatError::shape(
                "topology.number_of_cores",
                "must be positive",
            ));
        }
        if num_qubits % num_cores != 0 {
            return Err(PlatError::shape(
                "topology.number_of_cores",
                format!("{num_cores} does not divide the qubit count {num_qubits}"),
            ));
        }
        let qubits_per_core = num_qubits / num_cores;

        let comm_qubits_per_core = match obj.get("comm_qubits_per_core") {
            None => qubits_per_core,
            Some(v) => usize_field(v, "topology.comm_qubits_per_core")?,
        };
        if comm_qubits_per_core == 0 || comm_qubits_per_core > qubits_per_core {
            return Err(PlatError::shape(
                "topology.comm_qubits_per_core",
                format!("must be in 1..={qubits_per_core}"),
            ));
        }

        // Coordinates.
        let (xy_size, coords) = match form {
            GridForm::Irregular => (None, vec![None; num_qubits]),
            GridForm::Xy => {
                let x_size = required_usize(obj, "x_size", "topology.x_size")?;
                let y_size = required_usize(obj, "y_size", "topology.y_size")?;
                let qubits = obj
                    .get("qubits")
                    .ok_or_else(|| {
                        PlatError::shape("topology.qubits", "required for xy form")
                    })?
                    .as_array()
                    .ok_or_else(|| PlatError::shape("topology.qubits", "expected an array"))?;
                if qubits.len() != num_qubits {
                    return Err(PlatError::shape(
                        "topology.qubits",
                        format!("expected {num_qubits} entries, got {}", qubits.len()),
                    ));
                }
                let mut coords: Vec<Option<Coordinate>> = vec![None; num_qubits];
                for (i, q) in qubits.iter().enumerate() {
                    let path = format!("topology.qubits[{i}]");
                    let qobj = q
                        .as_object()
                        .ok_or_else(|| PlatError::shape(&path, "expected an object"))?;
                    let id = required_usize(qobj, "id", &format!("{path}.id"))?;
                    if id >= num_qubits {
                        return Err(PlatError::shape(
                            format!("{path}.id"),
                            format!("qubit id {id} out of range 0..{num_qubits}"),
                        ));
                    }
                    if coords[id].is_some() {
                        return Err(PlatError::shape(
                            format!("{path}.id"),
                            format!("duplicate coordinates for qubit {id}"),
                        ));
                    }
                    let x = required_i64(qobj, "x", &format!("{path}.x"))?;
                    let y = required_i64(qobj, "y", &format!("{path}.y"))?;
                    if x < 0 || x >= x_size as i64 {
                        return Err(PlatError::shape(
                            format!("{path}.x"),
                            format!("{x} out of range 0..{x_size}"),
                        ));
                    }
                    if y < 0 || y >= y_size as i64 {
                        return Err(PlatError::shape(
                            format!("{path}.y"),
                            format!("{y} out of range 0..{y_size}"),
                        ));
                    }
                    coords[id] = Some(Coordinate { x, y });
                }
                (
                    Some(Coordinate {
                        x: x_size as i64,
                        y: y_size as i64,
                    }),
                    coords,
                )
            }
        };

        // Connectivity, inferred from the edges section when absent.
        let connectivity = match obj.get("connectivity") {
            None => {
                if obj.contains_key("edges") {
                    Connectivity::Specified
                } else {
                    Connectivity::Full
                }
            }
            Some(Value::String(s)) if s == "specified" => Connectivity::Specified,
            Some(Value::String(s)) if s == "full" => Connectivity::Full,
            Some(Value::String(s)) => {
                return Err(PlatError::shape(
                    "topology.connectivity",
                    format!("unsupported connectivity '{s}'"),
                ));
            }
            Some(_) => {
                return Err(PlatError::shape("topology.connectivity", "expected a string"));
            }
        };

        let mut topology = Topology {
            num_qubits,
            num_cores,
            comm_qubits_per_core,
            form,
            xy_size,
            coords,
            connectivity,
            neighbors: vec![vec![]; num_qubits],
            distances: vec![],
            edge_ids: BTreeMap::new(),
        };

        match connectivity {
            Connectivity::Specified => {
                let edges = obj
                    .get("edges")
                    .ok_or_else(|| {
                        PlatError::shape("topology.edges", "required for specified connectivity")
                    })?
                    .as_array()
                    .ok_or_else(|| PlatError::shape("topology.edges", "expected an array"))?;
                let mut seen_ids = BTreeMap::new();
                for (i, e) in edges.iter().enumerate() {
                    let path = format!("topology.edges[{i}]");
                    let eobj = e
                        .as_object()
                        .ok_or_else(|| PlatError::shape(&path, "expected an object"))?;
                    let src = required_usize(eobj, "src", &format!("{path}.src"))?;
                    let dst = required_usize(eobj, "dst", &format!("{path}.dst"))?;
                    for (end, v) in [("src", src), ("dst", dst)] {
                        if v >= num_qubits {
                            return Err(PlatError::shape(
                                format!("{path}.{end}"),
                                format!("qubit {v} out of range 0..{num_qubits}"),
                            ));
                        }
                    }
                    if topology.neighbors[src].contains(&dst) {
                        return Err(PlatError::shape(
                            &path,
                            format!("redefinition of edge {src} -> {dst}"),
                        ));
                    }
                    let id = match eobj.get("id") {
                        None => (src * num_qubits + dst) as u64,
                        Some(v) => usize_field(v, &format!("{path}.id"))? as u64,
                    };
                    if let Some(other) = seen_ids.insert(id, (src, dst)) {
                        return Err(PlatError::shape(
                            format!("{path}.id"),
                            format!(
                                "edge id {id} already used by edge {} -> {}",
                                other.0, other.1
                            ),
                        ));
                    }
                    topology.neighbors[src].push(dst);
                    topology.edge_ids.insert((src, dst), id);
                }
                topology.sort_neighbors_clockwise();
                topology.compute_distances();
            }
            Connectivity::Full => {
                for qs in 0..num_qubits {
                    for qd in 0..num_qubits {
                        if qs == qd {
                            continue;
                        }
                        if topology.is_inter_core_hop(qs, qd)
                            && (!topology.is_comm_qubit(qs) || !topology.is_comm_qubit(qd))
                        {
                            continue;
                        }
                        topology.neighbors[qs].push(qd);
                    }
                }
                topology.sort_neighbors_clockwise();
                // Distances are analytic for full connectivity.
            }
        }

        debug!(
            qubits = num_qubits,
            cores = num_cores,
            ?form,
            ?connectivity,
            "topology loaded"
        );
        Ok(topology)
    }

    /// Total number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of cores; qubits are partitioned evenly over them.
    #[inline]
    pub fn num_cores(&self) -> usize {
        self.num_cores
    }

    /// Number of communication qubits per core.
    #[inline]
    pub fn comm_qubits_per_core(&self) -> usize {
        self.comm_qubits_per_core
    }

    /// The grid form.
    #[inline]
    pub fn form(&self) -> GridForm {
        self.form
    }

    /// The connectivity mode.
    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Whether qubits carry coordinates.
    #[inline]
    pub fn has_coordinates(&self) -> bool {
        self.form == GridForm::Xy
    }

    /// The coordinate of a qubit, when the form is XY.
    pub fn coordinate(&self, qubit: usize) -> Option<Coordinate> {
        self.coords.get(qubit).copied().flatten()
    }

    /// Neighbor list of a qubit, sorted clockwise from 12:00 when
    /// coordinates exist.
    pub fn neighbors(&self, qubit: usize) -> &[usize] {
        &self.neighbors[qubit]
    }

    /// Edge id of an enumerated edge, if present.
    pub fn edge_id(&self, src: usize, dst: usize) -> Option<u64> {
        self.edge_ids.get(&(src, dst)).copied()
    }

    /// Number of enumerated edges.
    pub fn edge_count(&self) -> usize {
        self.edge_ids.len()
    }

    /// Core index of a qubit.
    pub fn core_of(&self, qubit: usize) -> usize {
        qubit / (self.num_qubits / self.num_cores)
    }

    /// Whether a qubit may participate in inter-core operations. The first
    /// `comm_qubits_per_core` qubits of each core are communication qubits.
    pub fn is_comm_qubit(&self, qubit: usize) -> bool {
        if self.num_cores == 1 {
            return true;
        }
        qubit % (self.num_qubits / self.num_cores) < self.comm_qubits_per_core
    }

    /// Whether communication between the two qubits crosses a core boundary.
    pub fn is_inter_core_hop(&self, source: usize, target: usize) -> bool {
        self.core_of(source) != self.core_of(target)
    }

    /// Distance between two qubits in cores (0 within a core, 1 across;
    /// uniform core connectivity is assumed).
    pub fn core_distance(&self, source: usize, target: usize) -> u64 {
        u64::from(self.core_of(source) != self.core_of(target))
    }

    /// Distance between two qubits in hops. 0 iff `source == target`.
    pub fn distance(&self, source: usize, target: usize) -> u64 {
        match self.connectivity {
            Connectivity::Specified => self.distances[source][target],
            Connectivity::Full => {
                if source == target {
                    0
                } else if self.core_of(source) == self.core_of(target) {
                    1
                } else {
                    // Cross-core: hop to a communication qubit in-core where
                    // needed, then one inter-core hop.
                    match (self.is_comm_qubit(source), self.is_comm_qubit(target)) {
                        (true, true) => 1,
                        (true, false) | (false, true) => 2,
                        (false, false) => 3,
                    }
                }
            }
        }
    }

    /// Minimum number of hops a two-qubit interaction between the given
    /// qubits requires. Equals the distance, except when every hop of a
    /// shortest path would be inter-core: an inter-core hop cannot execute
    /// a two-qubit gate, so two extra intra-core hops are budgeted.
    pub fn min_hops(&self, source: usize, target: usize) -> u64 {
        let d = self.distance(source, target);
        let cd = self.core_distance(source, target);
        if d > 0 && cd == d { d + 2 } else { d }
    }

    /// Dump the topology to a writer, for diagnostics.
    pub fn dump(&self, w: &mut impl std::fmt::Write) -> std::fmt::Result {
        for q in 0..self.num_qubits {
            write!(w, "qubit[{q}]")?;
            if let Some(c) = self.coordinate(q) {
                write!(w, " at ({},{})", c.x, c.y)?;
            }
            write!(w, " neighbors:")?;
            for n in self.neighbors(q) {
                write!(w, " {n}")?;
            }
            writeln!(w)?;
        }
        for q in 0..self.num_qubits {
            write!(w, "distance({q},j):")?;
            for j in 0..self.num_qubits {
                let d = self.distance(q, j);
                if d == UNREACHABLE {
                    write!(w, " -")?;
                } else {
                    write!(w, " {d}")?;
                }
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Clockwise angle of `(x, y)` around `(cx, cy)` measured from 12:00,
    /// in `[0, 2*pi)`.
    fn angle(center: Coordinate, point: Coordinate) -> f64 {
        let a = ((point.x - center.x) as f64).atan2((point.y - center.y) as f64);
        if a < 0.0 {
            a + 2.0 * std::f64::consts::PI
        } else {
            a
        }
    }

    fn sort_neighbors_clockwise(&mut self) {
        if self.form != GridForm::Xy {
            return;
        }
        for q in 0..self.num_qubits {
            let Some(center) = self.coords[q] else {
                continue;
            };
            let coords = &self.coords;
            self.neighbors[q].sort_by(|&a, &b| {
                let aa = coords[a].map_or(0.0, |c| Self::angle(center, c));
                let ab = coords[b].map_or(0.0, |c| Self::angle(center, c));
                aa.total_cmp(&ab)
            });
        }
    }

    /// All-pairs shortest path over the enumerated neighbor lists.
    fn compute_distances(&mut self) {
        let n = self.num_qubits;
        let mut dist = vec![vec![UNREACHABLE; n]; n];
        for i in 0..n {
            dist[i][i] = 0;
            for &j in &self.neighbors[i] {
                dist[i][j] = 1;
            }
        }
        for k in 0..n {
            for i in 0..n {
                if dist[i][k] == UNREACHABLE {
                    continue;
                }
                for j in 0..n {
                    if dist[k][j] == UNREACHABLE {
                        continue;
                    }
                    let via = dist[i][k] + dist[k][j];
                    if via < dist[i][j] {
                        dist[i][j] = via;
                    }
                }
            }
        }
        self.distances = dist;
    }
}

fn usize_field(v: &Value, path: &str) -> PlatResult<usize> {
    v.as_u64()
        .map(|u| u as usize)
        .ok_or_else(|| PlatError::shape(path, "expected a non-negative integer"))
}

fn required_usize(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    path: &str,
) -> PlatResult<usize> {
    match obj.get(key) {
        Some(v) => usize_field(v, path),
        None => Err(PlatError::shape(path, "missing required field")),
    }
}

fn required_i64(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    path: &str,
) -> PlatResult<i64> {
    match obj.get(key) {
        Some(v) => v
            .as_i64()
            .ok_or_else(|| PlatError::shape(path, "expected an integer")),
        None => Err(PlatError::shape(path, "missing required field")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line3() -> Topology {
        // 0 - 1 - 2 in a line, both directions enumerated.
        Topology::from_json(
            3,
            &json!({
                "connectivity": "specified",
                "edges": [
                    {"src": 0, "dst": 1}, {"src": 1, "dst": 0},
                    {"src": 1, "dst": 2}, {"src": 2, "dst": 1},
                ],
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_specified_distances() {
        let t = line3();
        assert_eq!(t.distance(0, 0), 0);
        assert_eq!(t.distance(0, 1), 1);
        assert_eq!(t.distance(0, 2), 2);
        assert_eq!(t.distance(2, 0), 2);
    }

    #[test]
    fn test_distance_symmetry_with_symmetric_edges() {
        let t = line3();
        for a in 0..3 {
            for b in 0..3 {
                assert_eq!(t.distance(a, b), t.distance(b, a));
                assert_eq!(t.distance(a, b) == 0, a == b);
            }
        }
    }

    #[test]
    fn test_default_edge_ids() {
        let t = line3();
        assert_eq!(t.edge_id(0, 1), Some(1));
        assert_eq!(t.edge_id(1, 0), Some(3));
        assert_eq!(t.edge_id(0, 2), None);
        assert_eq!(t.edge_count(), 4);
    }

    #[test]
    fn test_duplicate_edge_id_rejected() {
        let err = Topology::from_json(
            2,
            &json!({
                "edges": [
                    {"src": 0, "dst": 1, "id": 7},
                    {"src": 1, "dst": 0, "id": 7},
                ],
            }),
        )
        .unwrap_err();
        assert!(matches!(err, PlatError::JsonShape { .. }));
    }

    #[test]
    fn test_full_single_core() {
        let t = Topology::from_json(4, &json!({})).unwrap();
        assert_eq!(t.connectivity(), Connectivity::Full);
        assert_eq!(t.neighbors(0).len(), 3);
        assert_eq!(t.distance(0, 3), 1);
        assert!(t.is_comm_qubit(2));
    }

    #[test]
    fn test_multi_core_comm_qubits() {
        // 8 qubits, 2 cores of 4, first qubit of each core communicates.
        let t = Topology::from_json(
            8,
            &json!({"number_of_cores": 2, "comm_qubits_per_core": 1}),
        )
        .unwrap();
        assert_eq!(t.core_of(3), 0);
        assert_eq!(t.core_of(4), 1);
        assert!(t.is_comm_qubit(0));
        assert!(!t.is_comm_qubit(1));
        assert!(t.is_comm_qubit(4));
        // comm-comm across cores: direct hop.
        assert_eq!(t.distance(0, 4), 1);
        // comm to non-comm across cores: via the target's comm qubit.
        assert_eq!(t.distance(0, 5), 2);
        // non-comm to non-comm across cores.
        assert_eq!(t.distance(1, 5), 3);
        // min_hops adds intra-core room when the path is all inter-core.
        assert_eq!(t.min_hops(0, 4), 3);
        assert_eq!(t.min_hops(1, 5), 3);
        // No inter-core edges between non-comm qubits.
        assert!(!t.neighbors(1).contains(&5));
        assert!(t.neighbors(1).contains(&0));
    }

    #[test]
    fn test_cores_must_divide_qubits() {
        let err = Topology::from_json(6, &json!({"number_of_cores": 4})).unwrap_err();
        assert!(matches!(err, PlatError::JsonShape { .. }));
    }

    #[test]
    fn test_xy_neighbors_sorted_clockwise() {
        // Plus-shaped grid around qubit 0 at the center.
        let t = Topology::from_json(
            5,
            &json!({
                "form": "xy",
                "x_size": 3,
                "y_size": 3,
                "qubits": [
                    {"id": 0, "x": 1, "y": 1},
                    {"id": 1, "x": 1, "y": 2},   // 12:00
                    {"id": 2, "x": 2, "y": 1},   // 3:00
                    {"id": 3, "x": 1, "y": 0},   // 6:00
                    {"id": 4, "x": 0, "y": 1},   // 9:00
                ],
                "edges": [
                    {"src": 0, "dst": 3}, {"src": 0, "dst": 1},
                    {"src": 0, "dst": 4}, {"src": 0, "dst": 2},
                ],
            }),
        )
        .unwrap();
        assert_eq!(t.neighbors(0), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let t = Topology::from_json(2, &json!({"vendor_extension": {"a": 1}})).unwrap();
        assert_eq!(t.num_qubits(), 2);
    }

    #[test]
    fn prop_full_connectivity_distance_is_a_metric() {
        use proptest::prelude::*;

        proptest!(|(cores in 1usize..4, per_core in 1usize..5, comm in 1usize..5)| {
            let comm = comm.min(per_core);
            let n = cores * per_core;
            let t = Topology::from_json(
                n,
                &json!({"number_of_cores": cores, "comm_qubits_per_core": comm}),
            )
            .unwrap();
            for a in 0..n {
                for b in 0..n {
                    prop_assert_eq!(t.distance(a, b), t.distance(b, a));
                    prop_assert_eq!(t.distance(a, b) == 0, a == b);
                }
            }
        });
    }

    #[test]
    fn test_form_inferred_from_qubits_key() {
        let err = Topology::from_json(1, &json!({"qubits": []})).unwrap_err();
        // Inferred xy form now requires x_size/y_size.
        assert!(matches!(err, PlatError::JsonShape { .. }));
    }
}
