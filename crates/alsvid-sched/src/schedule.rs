//! ASAP/ALAP critical-path and uniform scheduling, with and without
//! resource constraints.
//!
//! All schedulers consume a [`DependencyGraph`] and assign a cycle to each
//! gate of the circuit the graph was built from, then stably sort the
//! circuit by cycle (ties keep program order — an observable property).
//!
//! Without resource constraints, cycle assignment is a memoized traversal
//! of the graph: forward for ASAP, backward from a large sentinel for ALAP
//! (shifted afterwards so SOURCE lands at cycle 0).
//!
//! With resource constraints the ideal cycles drift, so a critical-path
//! *list scheduler* runs instead: it keeps an available list of nodes whose
//! dependencies are all scheduled, ordered by deep criticality, and fills
//! cycles one by one, consulting the resource model before committing a
//! gate. Zero-duration gates are preferred over everything else so that
//! markers and pseudo-instructions land at the earliest legal cycle.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use alsvid_ir::{Circuit, Kernel};

use crate::error::{SchedError, SchedResult};
use crate::graph::{CommuteOptions, DependencyGraph, NodeIndex};
use crate::resource::ResourceManager;

/// Base cycle for backward scheduling; far enough from zero that any real
/// schedule fits below it.
const ALAP_SINK_CYCLE: u64 = u64::MAX / 2;

/// Scheduling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Schedule from SOURCE upwards: as soon as possible.
    Forward,
    /// Schedule from SINK downwards: as late as possible.
    Backward,
}

/// Which schedule the kernel-level entry point produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerTarget {
    /// As soon as possible.
    Asap,
    /// As late as possible.
    Alap,
    /// ALAP-like with rebalanced bundle widths.
    Uniform,
}

/// Cycle assignment without resource constraints.
///
/// Forward: `cycle(n) = max over incoming arcs of cycle(pred) + weight`,
/// with SOURCE at 0. Backward is the dual with `min`, based at a large
/// sentinel; the caller shifts afterwards. The traversal is memoized and
/// recurses into unvisited neighbors, which tolerates arcs added against
/// circuit order by external callers.
fn assign_cycles(graph: &DependencyGraph, dir: Direction) -> SchedResult<Vec<u64>> {
    let n = graph.node_count();
    let mut cycles: Vec<Option<u64>> = vec![None; n];

    fn visit(
        graph: &DependencyGraph,
        dir: Direction,
        node: NodeIndex,
        cycles: &mut Vec<Option<u64>>,
    ) -> SchedResult<u64> {
        if let Some(c) = cycles[node.index()] {
            return Ok(c);
        }
        let mut curr = match dir {
            Direction::Forward => 0,
            Direction::Backward => ALAP_SINK_CYCLE,
        };
        match dir {
            Direction::Forward => {
                let preds: Vec<_> = graph.in_arcs(node).collect();
                for (pred, weight) in preds {
                    let pc = visit(graph, dir, pred, cycles)?;
                    let candidate = pc.checked_add(weight).ok_or(SchedError::CycleOverflow)?;
                    curr = curr.max(candidate);
                }
            }
            Direction::Backward => {
                let succs: Vec<_> = graph.out_arcs(node).collect();
                for (succ, weight) in succs {
                    let sc = visit(graph, dir, succ, cycles)?;
                    let candidate = sc.checked_sub(weight).ok_or(SchedError::CycleOverflow)?;
                    curr = curr.min(candidate);
                }
            }
        }
        cycles[node.index()] = Some(curr);
        Ok(curr)
    }

    let gate_count = n - 2;
    match dir {
        Direction::Forward => {
            visit(graph, dir, graph.source(), &mut cycles)?;
            for i in 0..gate_count {
                visit(graph, dir, graph.node_of(i), &mut cycles)?;
            }
            visit(graph, dir, graph.sink(), &mut cycles)?;
        }
        Direction::Backward => {
            visit(graph, dir, graph.sink(), &mut cycles)?;
            for i in (0..gate_count).rev() {
                visit(graph, dir, graph.node_of(i), &mut cycles)?;
            }
            visit(graph, dir, graph.source(), &mut cycles)?;
        }
    }

    let mut cycles: Vec<u64> = cycles.into_iter().map(|c| c.unwrap_or(0)).collect();
    if dir == Direction::Backward {
        // Shift so SOURCE sits at cycle 0.
        let shift = cycles[graph.source().index()];
        for c in &mut cycles {
            *c = c.checked_sub(shift).ok_or(SchedError::CycleOverflow)?;
        }
    }
    Ok(cycles)
}

/// Per-node criticality: cycles of critical-path work remaining past the
/// node, measured in the direction *opposite* to scheduling so that a
/// larger value always means more critical.
fn compute_remaining(graph: &DependencyGraph, dir: Direction) -> SchedResult<Vec<u64>> {
    let n = graph.node_count();
    let mut remaining: Vec<Option<u64>> = vec![None; n];

    fn visit(
        graph: &DependencyGraph,
        dir: Direction,
        node: NodeIndex,
        remaining: &mut Vec<Option<u64>>,
    ) -> SchedResult<u64> {
        if let Some(r) = remaining[node.index()] {
            return Ok(r);
        }
        let mut curr = 0u64;
        let arcs: Vec<_> = match dir {
            Direction::Forward => graph.out_arcs(node).collect(),
            Direction::Backward => graph.in_arcs(node).collect(),
        };
        for (other, weight) in arcs {
            let r = visit(graph, dir, other, remaining)?;
            let candidate = r.checked_add(weight).ok_or(SchedError::CycleOverflow)?;
            curr = curr.max(candidate);
        }
        remaining[node.index()] = Some(curr);
        Ok(curr)
    }

    let gate_count = n - 2;
    match dir {
        Direction::Forward => {
            visit(graph, dir, graph.sink(), &mut remaining)?;
            for i in (0..gate_count).rev() {
                visit(graph, dir, graph.node_of(i), &mut remaining)?;
            }
            visit(graph, dir, graph.source(), &mut remaining)?;
        }
        Direction::Backward => {
            visit(graph, dir, graph.source(), &mut remaining)?;
            for i in 0..gate_count {
                visit(graph, dir, graph.node_of(i), &mut remaining)?;
            }
            visit(graph, dir, graph.sink(), &mut remaining)?;
        }
    }

    Ok(remaining.into_iter().map(|r| r.unwrap_or(0)).collect())
}

/// Deep-criticality comparison: whether `n1` is strictly less critical
/// than `n2`.
///
/// Compares `remaining` first; ties look at the most critical direct
/// dependent, then at how many dependents share that maximum, then recurse
/// into the most critical dependents themselves.
fn criticality_lessthan(
    graph: &DependencyGraph,
    remaining: &[u64],
    forward: bool,
    n1: NodeIndex,
    n2: NodeIndex,
) -> bool {
    if n1 == n2 {
        return false;
    }
    if remaining[n1.index()] != remaining[n2.index()] {
        return remaining[n1.index()] < remaining[n2.index()];
    }

    let mut ln1 = graph.dependents(n1, forward);
    let mut ln2 = graph.dependents(n2, forward);
    if ln2.is_empty() {
        return false;
    }
    if ln1.is_empty() {
        return true;
    }

    let max1 = ln1.iter().map(|d| remaining[d.index()]).max().unwrap_or(0);
    let max2 = ln2.iter().map(|d| remaining[d.index()]).max().unwrap_or(0);
    if max1 != max2 {
        return max1 < max2;
    }

    ln1.retain(|d| remaining[d.index()] == max1);
    ln2.retain(|d| remaining[d.index()] == max2);
    if ln1.len() != ln2.len() {
        return ln1.len() < ln2.len();
    }

    let by_depth = |a: &NodeIndex, b: &NodeIndex| -> Ordering {
        if criticality_lessthan(graph, remaining, forward, *a, *b) {
            Ordering::Less
        } else if criticality_lessthan(graph, remaining, forward, *b, *a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    };
    ln1.sort_by(by_depth);
    ln2.sort_by(by_depth);
    criticality_lessthan(
        graph,
        remaining,
        forward,
        *ln1.last().expect("non-empty"),
        *ln2.last().expect("non-empty"),
    )
}

/// Copy the computed cycles into the circuit's gates and restore the
/// cycles-valid sort order.
fn apply_cycles(circuit: &mut Circuit, graph: &DependencyGraph, cycles: &[u64]) {
    for i in 0..circuit.len() {
        let node = graph.node_of(i);
        if let Some(gate) = circuit.get_mut(i) {
            gate.cycle = Some(cycles[node.index()]);
        }
    }
    circuit.sort_by_cycle();
}

/// ASAP schedule without resource constraints. Returns the circuit depth
/// (the SINK cycle).
pub fn schedule_asap(circuit: &mut Circuit, graph: &DependencyGraph) -> SchedResult<u64> {
    let cycles = assign_cycles(graph, Direction::Forward)?;
    apply_cycles(circuit, graph, &cycles);
    Ok(cycles[graph.sink().index()])
}

/// ALAP schedule without resource constraints, shifted so SOURCE sits at
/// cycle 0. Returns the circuit depth.
pub fn schedule_alap(circuit: &mut Circuit, graph: &DependencyGraph) -> SchedResult<u64> {
    let cycles = assign_cycles(graph, Direction::Backward)?;
    apply_cycles(circuit, graph, &cycles);
    Ok(cycles[graph.sink().index()])
}

/// Resource-constrained critical-path list scheduler.
///
/// Fills cycles one by one from the available list, highest deep
/// criticality first, preferring zero-duration gates. SOURCE, SINK, dummy,
/// classical and wait gates bypass the resource model; every other gate is
/// committed with exactly one `reserve` call. When no available node fits
/// the current cycle, the cycle advances; if that happens more than
/// `max(max arc weight, 1) * node count` times in a row, the schedule is
/// reported infeasible.
pub fn schedule_rc(
    circuit: &mut Circuit,
    graph: &DependencyGraph,
    dir: Direction,
    rm: &mut dyn ResourceManager,
) -> SchedResult<u64> {
    rm.reset();
    let forward = dir == Direction::Forward;
    let n = graph.node_count();
    let remaining = compute_remaining(graph, dir)?;

    let mut cycles: Vec<u64> = vec![0; n];
    let mut scheduled = vec![false; n];
    let mut avlist: Vec<NodeIndex> = vec![];

    let mut curr_cycle = if forward { 0 } else { ALAP_SINK_CYCLE };
    let start = if forward { graph.source() } else { graph.sink() };
    cycles[start.index()] = curr_cycle;
    avlist.push(start);

    let stall_limit = graph.max_weight().max(1) * n as u64;
    let mut stalls: u64 = 0;

    // Tentative cycle of a node all of whose dependencies are scheduled.
    let tentative = |node: NodeIndex, cycles: &[u64]| -> SchedResult<u64> {
        if forward {
            let mut c = 0u64;
            for (pred, weight) in graph.in_arcs(node) {
                let candidate = cycles[pred.index()]
                    .checked_add(weight)
                    .ok_or(SchedError::CycleOverflow)?;
                c = c.max(candidate);
            }
            Ok(c)
        } else {
            let mut c = ALAP_SINK_CYCLE;
            for (succ, weight) in graph.out_arcs(node) {
                let candidate = cycles[succ.index()]
                    .checked_sub(weight)
                    .ok_or(SchedError::CycleOverflow)?;
                c = c.min(candidate);
            }
            Ok(c)
        }
    };

    while !avlist.is_empty() {
        // Select the first schedulable node, zero-duration gates first;
        // the list is deep-criticality ordered, so "first" means "most
        // critical".
        let ready = |node: NodeIndex| -> bool {
            let c = cycles[node.index()];
            if forward { c <= curr_cycle } else { c >= curr_cycle }
        };
        let schedulable = |node: NodeIndex| -> bool {
            if !ready(node) {
                return false;
            }
            let data = graph.node_data(node);
            if data.resource_exempt {
                return true;
            }
            let gate = graph
                .gate_index(node)
                .and_then(|i| circuit.get(i))
                .expect("non-exempt nodes are gates");
            rm.available(curr_cycle, gate)
        };

        let selected = avlist
            .iter()
            .copied()
            .find(|&node| graph.node_data(node).duration_cycles == 0 && schedulable(node))
            .or_else(|| avlist.iter().copied().find(|&node| schedulable(node)));

        let Some(node) = selected else {
            // Nothing fits this cycle; advance and retry. Gates complete
            // and resources free up as the cycle moves.
            stalls += 1;
            if stalls > stall_limit {
                return Err(SchedError::ScheduleInfeasible {
                    stalls,
                    limit: stall_limit,
                });
            }
            curr_cycle = if forward {
                curr_cycle.checked_add(1).ok_or(SchedError::CycleOverflow)?
            } else {
                curr_cycle.checked_sub(1).ok_or(SchedError::CycleOverflow)?
            };
            continue;
        };
        stalls = 0;

        // Commit the node to the schedule.
        cycles[node.index()] = curr_cycle;
        let data = graph.node_data(node);
        if !data.resource_exempt {
            let gate = graph
                .gate_index(node)
                .and_then(|i| circuit.get(i))
                .expect("non-exempt nodes are gates");
            rm.reserve(curr_cycle, gate);
        }
        scheduled[node.index()] = true;
        avlist.retain(|&m| m != node);

        // Dependents whose dependencies are now all scheduled become
        // available, ordered into the list by deep criticality; a node of
        // equal criticality is inserted after the existing ones, so ties
        // resolve by insertion order.
        for dep in graph.dependents(node, forward) {
            let deps_scheduled = graph
                .dependents(dep, !forward)
                .iter()
                .all(|p| scheduled[p.index()]);
            if !deps_scheduled || avlist.contains(&dep) {
                continue;
            }
            cycles[dep.index()] = tentative(dep, &cycles)?;
            let pos = avlist
                .iter()
                .position(|&m| criticality_lessthan(graph, &remaining, forward, m, dep));
            match pos {
                Some(p) => avlist.insert(p, dep),
                None => avlist.push(dep),
            }
        }
    }

    if !forward {
        let shift = cycles[graph.source().index()];
        for c in &mut cycles {
            *c = c.checked_sub(shift).ok_or(SchedError::CycleOverflow)?;
        }
    }

    apply_cycles(circuit, graph, &cycles);
    Ok(cycles[graph.sink().index()])
}

/// Uniform-ALAP bundle balancing.
///
/// Starts from an ASAP schedule, then scans bundles from the last cycle
/// down, pulling gates forward from earlier bundles into too-small ones.
/// A candidate must not complete past the circuit's end nor violate any of
/// its forward arcs; among acceptable candidates the least critical one
/// moves, which preserves the critical path. The result only lowers peak
/// bundle width and never extends circuit depth.
pub fn schedule_uniform(circuit: &mut Circuit, graph: &DependencyGraph) -> SchedResult<u64> {
    let mut cycles = assign_cycles(graph, Direction::Forward)?;
    let sink_cycle = cycles[graph.sink().index()];
    let remaining = compute_remaining(graph, Direction::Forward)?;

    // Bundles of gate indices per cycle.
    let mut bundles: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for i in 0..circuit.len() {
        bundles
            .entry(cycles[graph.node_of(i).index()])
            .or_default()
            .push(i);
    }

    let mut non_empty = bundles.values().filter(|b| !b.is_empty()).count() as u64;
    let mut gate_count = circuit.len() as u64;

    for curr in (1..=sink_cycle).rev() {
        if non_empty == 0 {
            break;
        }
        // Target width: gates still to place over non-empty bundles still
        // to go; readjusted as moves happen.
        let mut target = gate_count as f64 / non_empty as f64;
        let mut pred = curr - 1;

        while (bundles.get(&curr).map_or(0, Vec::len) as f64) < target {
            // Scan the bundle at pred for the best movable candidate.
            let mut best: Option<usize> = None;
            let mut min_remaining = u64::MAX;
            for &gi in bundles.get(&pred).map_or(&[][..], Vec::as_slice) {
                let node = graph.node_of(gi);
                let completion = curr
                    .checked_add(graph.node_data(node).duration_cycles)
                    .ok_or(SchedError::CycleOverflow)?;
                // Completing at SINK is fine, later is not.
                let mut movable = completion <= sink_cycle;
                if movable {
                    for (succ, weight) in graph.out_arcs(node) {
                        if curr + weight > cycles[succ.index()] {
                            movable = false;
                            break;
                        }
                    }
                }
                if movable && remaining[node.index()] < min_remaining {
                    min_remaining = remaining[node.index()];
                    best = Some(gi);
                }
            }

            if let Some(gi) = best {
                let source_bundle = bundles.get_mut(&pred).expect("candidate came from here");
                source_bundle.retain(|&x| x != gi);
                if source_bundle.is_empty() {
                    non_empty -= 1;
                }
                let target_bundle = bundles.entry(curr).or_default();
                if target_bundle.is_empty() {
                    non_empty += 1;
                }
                target_bundle.push(gi);
                cycles[graph.node_of(gi).index()] = curr;

                if non_empty == 0 {
                    break;
                }
                target = gate_count as f64 / non_empty as f64;
            } else if pred == 0 {
                break;
            } else {
                pred -= 1;
            }
        }

        // This bundle is final; mask it from the counts for the rest of
        // the scan.
        let curr_len = bundles.get(&curr).map_or(0, Vec::len) as u64;
        gate_count -= curr_len;
        if curr_len > 0 {
            non_empty -= 1;
        }
    }

    apply_cycles(circuit, graph, &cycles);
    Ok(sink_cycle)
}

/// Kernel-level entry point: build the dependency graph and run the
/// selected scheduler, restoring the kernel's cycles-valid flag.
///
/// An empty kernel schedules trivially to depth 0. When a resource manager
/// is supplied, ASAP/ALAP run resource-constrained; the uniform target
/// never consults resources.
pub fn schedule_kernel(
    kernel: &mut Kernel,
    cycle_time: u64,
    target: SchedulerTarget,
    commute: CommuteOptions,
    rm: Option<&mut dyn ResourceManager>,
) -> SchedResult<u64> {
    if kernel.circuit.is_empty() {
        kernel.cycles_valid = true;
        return Ok(0);
    }
    let graph = DependencyGraph::build(kernel, cycle_time, commute)?;
    debug!(kernel = %kernel.name, ?target, "scheduling kernel");
    let depth = match (target, rm) {
        (SchedulerTarget::Uniform, _) => schedule_uniform(&mut kernel.circuit, &graph)?,
        (SchedulerTarget::Asap, None) => schedule_asap(&mut kernel.circuit, &graph)?,
        (SchedulerTarget::Alap, None) => schedule_alap(&mut kernel.circuit, &graph)?,
        (SchedulerTarget::Asap, Some(rm)) => {
            schedule_rc(&mut kernel.circuit, &graph, Direction::Forward, rm)?
        }
        (SchedulerTarget::Alap, Some(rm)) => {
            schedule_rc(&mut kernel.circuit, &graph, Direction::Backward, rm)?
        }
    };
    kernel.cycles_valid = true;
    debug!(kernel = %kernel.name, depth, "kernel scheduled");
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::Gate;

    fn kernel_of(gates: Vec<Gate>, qubits: usize) -> Kernel {
        let mut k = Kernel::new("test", qubits, 0, 0);
        for g in gates {
            k.push(g);
        }
        k
    }

    fn cycles_by_name(kernel: &Kernel) -> Vec<(String, u64)> {
        kernel
            .circuit
            .iter()
            .map(|g| (g.name.clone(), g.cycle.unwrap()))
            .collect()
    }

    #[test]
    fn test_asap_chain() {
        // x q0; z q0 with unit durations: cycles 0 and 1.
        let mut k = kernel_of(
            vec![Gate::quantum("x", [0], 1), Gate::quantum("z", [0], 1)],
            1,
        );
        let depth = schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Asap,
            CommuteOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(cycles_by_name(&k), vec![("x".into(), 0), ("z".into(), 1)]);
        assert_eq!(depth, 2);
        assert!(k.cycles_valid);
    }

    #[test]
    fn test_commuting_rotations_share_cycle() {
        // Three rz on one qubit: all at cycle 0 under commutation,
        // 0/1/2 without.
        let gates = vec![
            Gate::quantum("rz", [0], 1),
            Gate::quantum("rz", [0], 1),
            Gate::quantum("rz", [0], 1),
        ];
        let mut k = kernel_of(gates.clone(), 1);
        schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Asap,
            CommuteOptions {
                multi_qubit: false,
                single_qubit: true,
            },
            None,
        )
        .unwrap();
        assert!(k.circuit.iter().all(|g| g.cycle == Some(0)));

        let mut k = kernel_of(gates, 1);
        schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Asap,
            CommuteOptions::default(),
            None,
        )
        .unwrap();
        let cycles: Vec<u64> = k.circuit.iter().map(|g| g.cycle.unwrap()).collect();
        assert_eq!(cycles, vec![0, 1, 2]);
    }

    #[test]
    fn test_cnot_control_commutation() {
        // Two CNOTs sharing the control, duration 2: both at cycle 0 under
        // multi-qubit commutation, 0 and 2 without.
        let gates = vec![
            Gate::quantum("cnot", [0, 1], 2),
            Gate::quantum("cnot", [0, 2], 2),
        ];
        let mut k = kernel_of(gates.clone(), 3);
        schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Asap,
            CommuteOptions {
                multi_qubit: true,
                single_qubit: false,
            },
            None,
        )
        .unwrap();
        assert!(k.circuit.iter().all(|g| g.cycle == Some(0)));

        let mut k = kernel_of(gates, 3);
        schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Asap,
            CommuteOptions::default(),
            None,
        )
        .unwrap();
        let cycles: Vec<u64> = k.circuit.iter().map(|g| g.cycle.unwrap()).collect();
        assert_eq!(cycles, vec![0, 2]);
    }

    #[test]
    fn test_alap_shifts_source_to_zero() {
        // Parallel short and long chains: ALAP pushes the short one late,
        // but nothing goes negative and SOURCE sits at 0.
        let mut k = kernel_of(
            vec![
                Gate::quantum("a", [0], 1),
                Gate::quantum("b", [0], 1),
                Gate::quantum("c", [0], 1),
                Gate::quantum("late", [1], 1),
            ],
            2,
        );
        let depth = schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Alap,
            CommuteOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(depth, 3);
        let by_name: std::collections::HashMap<String, u64> =
            cycles_by_name(&k).into_iter().collect();
        assert_eq!(by_name["a"], 0);
        assert_eq!(by_name["b"], 1);
        assert_eq!(by_name["c"], 2);
        // The single gate on q1 floats to the latest start that still
        // completes by the circuit end.
        assert_eq!(by_name["late"], 2);
    }

    #[test]
    fn test_dependency_soundness_asap_alap() {
        use petgraph::visit::EdgeRef;

        let gates = vec![
            Gate::quantum("h", [0], 2),
            Gate::quantum("cnot", [0, 1], 4),
            Gate::measure(1, 0, 0, 6),
        ];
        for target in [SchedulerTarget::Asap, SchedulerTarget::Alap] {
            let mut k = Kernel::new("t", 2, 1, 1);
            for g in gates.clone() {
                k.push(g);
            }
            // Record the arcs by gate name before scheduling reorders the
            // circuit.
            let graph = DependencyGraph::build(&k, 2, CommuteOptions::default()).unwrap();
            let name_of = |n: NodeIndex| -> Option<String> {
                graph
                    .gate_index(n)
                    .map(|i| k.circuit.get(i).unwrap().name.clone())
            };
            let arcs: Vec<(String, String, u64)> = graph
                .graph()
                .edge_references()
                .filter_map(|e| {
                    Some((name_of(e.source())?, name_of(e.target())?, e.weight().weight))
                })
                .collect();
            assert!(!arcs.is_empty());

            schedule_kernel(&mut k, 2, target, CommuteOptions::default(), None).unwrap();
            let cycle: std::collections::HashMap<String, u64> =
                cycles_by_name(&k).into_iter().collect();
            for (u, v, w) in arcs {
                assert!(
                    cycle[&v] >= cycle[&u] + w,
                    "{u}@{} -> {v}@{} violates weight {w} ({target:?})",
                    cycle[&u],
                    cycle[&v],
                );
            }
        }
    }

    #[test]
    fn test_uniform_preserves_depth() {
        // A wide first bundle: uniform moves gates later without changing
        // the sink cycle.
        let mut k = kernel_of(
            vec![
                Gate::quantum("a", [0], 1),
                Gate::quantum("b", [0], 1),
                Gate::quantum("c", [0], 1),
                Gate::quantum("p", [1], 1),
                Gate::quantum("q", [2], 1),
            ],
            3,
        );
        let asap_depth = {
            let mut k2 = k.clone();
            schedule_kernel(
                &mut k2,
                1,
                SchedulerTarget::Asap,
                CommuteOptions::default(),
                None,
            )
            .unwrap()
        };
        let uniform_depth = schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Uniform,
            CommuteOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(asap_depth, uniform_depth);
        // Dependencies still hold.
        let by_name: std::collections::HashMap<String, u64> =
            cycles_by_name(&k).into_iter().collect();
        assert!(by_name["a"] < by_name["b"]);
        assert!(by_name["b"] < by_name["c"]);
    }

    #[test]
    fn test_empty_kernel_schedules_to_zero() {
        let mut k = Kernel::new("empty", 2, 0, 0);
        let depth = schedule_kernel(
            &mut k,
            1,
            SchedulerTarget::Asap,
            CommuteOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(depth, 0);
        assert!(k.cycles_valid);
    }
}
