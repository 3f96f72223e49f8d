//! Event-driven dependency-graph construction.
//!
//! The graph captures the minimal ordering constraints between the gates of
//! one kernel. Each gate produces a sequence of *events*, one per operand;
//! a per-operand state machine turns consecutive events into typed arcs.
//!
//! On qubits the events are `Default`, `XRotate` and `ZRotate`. Defaults
//! sequentialize with everything; X rotations commute among themselves, as
//! do Z rotations, but X and Z never commute with each other. When the
//! corresponding commutation option is enabled, the X-after-X and
//! Z-after-Z arcs are omitted, leaving the commuting gates an antichain the
//! scheduler may reorder freely. On classical and bit registers the events
//! are `Write` and `Read`: writes sequentialize, reads commute (their
//! mutual ordering arcs are never emitted).
//!
//! Synthetic SOURCE and SINK nodes close every chain: SOURCE behaves as a
//! write to every register at the start, SINK as one at the end, so SINK's
//! cycle equals the circuit latency.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use alsvid_ir::{Circuit, Gate, GateKind, Kernel};

use crate::error::{SchedError, SchedResult};

/// Node index type for the dependency graph.
pub type NodeIndex = PetNodeIndex<u32>;

/// Gate names treated as Z-axis single-qubit rotations.
const Z_ROTATIONS: &[&str] = &[
    "rz", "z", "pauli_z", "rz180", "z90", "rz90", "zm90", "mrz90", "s", "sdag", "t", "tdag",
];

/// Gate names treated as X-axis single-qubit rotations.
const X_ROTATIONS: &[&str] = &[
    "rx", "x", "pauli_x", "rx180", "x90", "rx90", "xm90", "mrx90", "x45",
];

/// The kind of a dependency arc, named `AAfterB`: the target gate does A,
/// preceded by a gate that did B on the same operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    /// Read after read (only emitted when read commutation is disabled;
    /// never, in the current rules).
    ReadAfterRead,
    /// Read after write.
    ReadAfterWrite,
    /// Write after read.
    WriteAfterRead,
    /// Write after write.
    WriteAfterWrite,
    /// Default use after default use.
    DefaultAfterDefault,
    /// Default use after an X rotation.
    DefaultAfterX,
    /// Default use after a Z rotation.
    DefaultAfterZ,
    /// X rotation after default use.
    XAfterDefault,
    /// X rotation after X rotation (suppressed under commutation).
    XAfterX,
    /// X rotation after Z rotation; X and Z never commute.
    XAfterZ,
    /// Z rotation after default use.
    ZAfterDefault,
    /// Z rotation after X rotation; X and Z never commute.
    ZAfterX,
    /// Z rotation after Z rotation (suppressed under commutation).
    ZAfterZ,
}

/// The operand domain an arc is caused by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// A qubit operand.
    Qubit,
    /// A classical register operand.
    Creg,
    /// A bit register operand.
    Breg,
}

/// A dependency arc: the source gate must complete `weight` cycles before
/// the target gate may begin, because both touch the recorded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepEdge {
    /// Cycles the source gate needs to complete.
    pub weight: u64,
    /// The dependency kind.
    pub kind: DepKind,
    /// Operand domain that caused the dependency.
    pub operand_kind: OperandKind,
    /// Operand index within its domain.
    pub operand: usize,
}

/// What a graph node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic program entry.
    Source,
    /// Synthetic program exit.
    Sink,
    /// The gate at this index in the kernel's circuit.
    Gate(usize),
}

/// Per-node data cached from the gate so schedulers need not chase the
/// circuit for hot attributes.
#[derive(Debug, Clone, Copy)]
pub struct NodeData {
    /// What this node stands for.
    pub kind: NodeKind,
    /// Duration in cycles; 0 for SOURCE and SINK.
    pub duration_cycles: u64,
    /// Whether the resource model is not consulted for this node
    /// (SOURCE, SINK, dummy, classical and wait gates).
    pub resource_exempt: bool,
}

/// Which commutation classes the builder may leave unordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommuteOptions {
    /// Commute same-axis rotations of multi-qubit gates (cnot/cz operands).
    pub multi_qubit: bool,
    /// Commute same-axis single-qubit rotations.
    pub single_qubit: bool,
}

/// The dependency graph of one kernel's circuit.
///
/// Built once from the gate sequence; schedulers reuse it without
/// modification. External callers may inject extra arcs with
/// [`DependencyGraph::add_arc`] (e.g. to pin a commutation variation) and
/// must then re-validate with [`DependencyGraph::check_acyclic`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<NodeData, DepEdge, u32>,
    source: NodeIndex,
    sink: NodeIndex,
    /// Gate index in the circuit to its node.
    nodes: Vec<NodeIndex>,
}

/// Qubit-operand state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QubitEvent {
    Default,
    XRotate,
    ZRotate,
}

/// Classical/bit-operand state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegEvent {
    Write,
    Read,
}

/// Per-operand-domain state for register (creg/breg) operands.
struct RegState {
    last_event: Vec<RegEvent>,
    last_writer: Vec<NodeIndex>,
    last_readers: Vec<Vec<NodeIndex>>,
}

impl RegState {
    fn new(count: usize, source: NodeIndex) -> Self {
        Self {
            last_event: vec![RegEvent::Write; count],
            last_writer: vec![source; count],
            last_readers: vec![vec![]; count],
        }
    }
}

struct Builder {
    cycle_time: u64,
    graph: DiGraph<NodeData, DepEdge, u32>,
    nodes: Vec<NodeIndex>,
    commute: CommuteOptions,
    // Qubit state machines, indexed by qubit operand.
    last_q_event: Vec<QubitEvent>,
    last_default: Vec<NodeIndex>,
    last_xrotates: Vec<Vec<NodeIndex>>,
    last_zrotates: Vec<Vec<NodeIndex>>,
    // Register state machines.
    cregs: RegState,
    bregs: RegState,
}

impl DependencyGraph {
    /// Build the dependency graph for a kernel's circuit.
    ///
    /// `cycle_time` converts gate durations into arc weights. The kernel's
    /// register counts bound the operand state machines; operands outside
    /// them are an error.
    pub fn build(
        kernel: &Kernel,
        cycle_time: u64,
        commute: CommuteOptions,
    ) -> SchedResult<Self> {
        let mut graph = DiGraph::default();
        let source = graph.add_node(NodeData {
            kind: NodeKind::Source,
            duration_cycles: 0,
            resource_exempt: true,
        });

        let mut builder = Builder {
            cycle_time,
            graph,
            nodes: Vec::with_capacity(kernel.circuit.len()),
            commute,
            last_q_event: vec![QubitEvent::Default; kernel.qubit_count],
            last_default: vec![source; kernel.qubit_count],
            last_xrotates: vec![vec![]; kernel.qubit_count],
            last_zrotates: vec![vec![]; kernel.qubit_count],
            cregs: RegState::new(kernel.creg_count, source),
            bregs: RegState::new(kernel.breg_count, source),
        };

        for (index, gate) in kernel.circuit.iter().enumerate() {
            builder.add_gate(index, gate)?;
        }
        let sink = builder.close(kernel)?;

        let nodes = builder.nodes;
        let graph = builder.graph;
        let result = Self {
            graph,
            source,
            sink,
            nodes,
        };
        result.check_acyclic()?;
        debug!(
            gates = kernel.circuit.len(),
            arcs = result.graph.edge_count(),
            kernel = %kernel.name,
            "dependency graph built"
        );
        Ok(result)
    }

    /// The synthetic entry node.
    #[inline]
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// The synthetic exit node.
    #[inline]
    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    /// The node representing the gate at `gate_index` in the circuit.
    #[inline]
    pub fn node_of(&self, gate_index: usize) -> NodeIndex {
        self.nodes[gate_index]
    }

    /// The circuit index of the gate a node stands for, if it is a gate.
    pub fn gate_index(&self, node: NodeIndex) -> Option<usize> {
        match self.graph[node].kind {
            NodeKind::Gate(i) => Some(i),
            _ => None,
        }
    }

    /// Per-node cached data.
    #[inline]
    pub fn node_data(&self, node: NodeIndex) -> &NodeData {
        &self.graph[node]
    }

    /// Total node count, including SOURCE and SINK.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Borrow the underlying graph.
    pub fn graph(&self) -> &DiGraph<NodeData, DepEdge, u32> {
        &self.graph
    }

    /// The largest arc weight, in cycles.
    pub fn max_weight(&self) -> u64 {
        self.graph
            .edge_references()
            .map(|e| e.weight().weight)
            .max()
            .unwrap_or(0)
    }

    /// Inject an extra ordering arc. The weight is the source node's
    /// duration, like every constructed arc. The caller is responsible for
    /// re-validating acyclicity afterwards.
    pub fn add_arc(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        kind: DepKind,
        operand_kind: OperandKind,
        operand: usize,
    ) {
        let weight = self.graph[from].duration_cycles;
        self.graph.add_edge(
            from,
            to,
            DepEdge {
                weight,
                kind,
                operand_kind,
                operand,
            },
        );
    }

    /// Fail with [`SchedError::GraphNotAcyclic`] if the graph has a cycle.
    pub fn check_acyclic(&self) -> SchedResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(SchedError::GraphNotAcyclic);
        }
        Ok(())
    }

    /// Direct dependents of a node in the given scheduling direction
    /// (successors when forward, predecessors when backward), without
    /// duplicates, in first-encounter order.
    pub fn dependents(&self, node: NodeIndex, forward: bool) -> Vec<NodeIndex> {
        let dir = if forward {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };
        let mut out: Vec<NodeIndex> = vec![];
        for edge in self.graph.edges_directed(node, dir) {
            let other = if forward { edge.target() } else { edge.source() };
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    /// Iterate `(predecessor, weight)` over the incoming arcs of a node.
    pub fn in_arcs(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, u64)> + '_ {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), e.weight().weight))
    }

    /// Iterate `(successor, weight)` over the outgoing arcs of a node.
    pub fn out_arcs(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, u64)> + '_ {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().weight))
    }

    /// Dump the graph to a writer, for diagnostics.
    pub fn dump(&self, circuit: &Circuit, w: &mut impl std::fmt::Write) -> std::fmt::Result {
        for node in self.graph.node_indices() {
            let label = match self.graph[node].kind {
                NodeKind::Source => "SOURCE".to_string(),
                NodeKind::Sink => "SINK".to_string(),
                NodeKind::Gate(i) => circuit
                    .get(i)
                    .map_or_else(|| format!("gate[{i}]"), ToString::to_string),
            };
            writeln!(w, "node {}: {label}", node.index())?;
            for e in self.graph.edges_directed(node, Direction::Outgoing) {
                let d = e.weight();
                writeln!(
                    w,
                    "  -> {} ({:?} {:?}[{}] w={})",
                    e.target().index(),
                    d.kind,
                    d.operand_kind,
                    d.operand,
                    d.weight,
                )?;
            }
        }
        Ok(())
    }
}

impl Builder {
    /// Add the arc `from -> to`, weighted by the source node's duration.
    fn add_dep(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        kind: DepKind,
        operand_kind: OperandKind,
        operand: usize,
    ) {
        let weight = self.graph[from].duration_cycles;
        self.graph.add_edge(
            from,
            to,
            DepEdge {
                weight,
                kind,
                operand_kind,
                operand,
            },
        );
    }

    /// Step the qubit state machine for a `Default` event.
    fn on_default(&mut self, node: NodeIndex, qubit: usize) {
        match self.last_q_event[qubit] {
            QubitEvent::Default => {
                self.add_dep(
                    self.last_default[qubit],
                    node,
                    DepKind::DefaultAfterDefault,
                    OperandKind::Qubit,
                    qubit,
                );
            }
            QubitEvent::ZRotate => {
                for z in self.last_zrotates[qubit].clone() {
                    self.add_dep(z, node, DepKind::DefaultAfterZ, OperandKind::Qubit, qubit);
                }
            }
            QubitEvent::XRotate => {
                for x in self.last_xrotates[qubit].clone() {
                    self.add_dep(x, node, DepKind::DefaultAfterX, OperandKind::Qubit, qubit);
                }
            }
        }
        self.last_default[qubit] = node;
        self.last_q_event[qubit] = QubitEvent::Default;
    }

    /// Step the qubit state machine for a `ZRotate` event.
    fn on_zrotate(&mut self, node: NodeIndex, qubit: usize, commutes: bool) {
        self.add_dep(
            self.last_default[qubit],
            node,
            DepKind::ZAfterDefault,
            OperandKind::Qubit,
            qubit,
        );
        if self.last_q_event[qubit] != QubitEvent::ZRotate {
            self.last_zrotates[qubit].clear();
        } else if !commutes {
            for z in self.last_zrotates[qubit].clone() {
                self.add_dep(z, node, DepKind::ZAfterZ, OperandKind::Qubit, qubit);
            }
        }
        for x in self.last_xrotates[qubit].clone() {
            self.add_dep(x, node, DepKind::ZAfterX, OperandKind::Qubit, qubit);
        }
        self.last_zrotates[qubit].push(node);
        self.last_q_event[qubit] = QubitEvent::ZRotate;
    }

    /// Step the qubit state machine for an `XRotate` event.
    fn on_xrotate(&mut self, node: NodeIndex, qubit: usize, commutes: bool) {
        self.add_dep(
            self.last_default[qubit],
            node,
            DepKind::XAfterDefault,
            OperandKind::Qubit,
            qubit,
        );
        if self.last_q_event[qubit] != QubitEvent::XRotate {
            self.last_xrotates[qubit].clear();
        }
        for z in self.last_zrotates[qubit].clone() {
            self.add_dep(z, node, DepKind::XAfterZ, OperandKind::Qubit, qubit);
        }
        if self.last_q_event[qubit] == QubitEvent::XRotate && !commutes {
            for x in self.last_xrotates[qubit].clone() {
                self.add_dep(x, node, DepKind::XAfterX, OperandKind::Qubit, qubit);
            }
        }
        self.last_xrotates[qubit].push(node);
        self.last_q_event[qubit] = QubitEvent::XRotate;
    }

    fn reg_state(&mut self, operand_kind: OperandKind) -> &mut RegState {
        match operand_kind {
            OperandKind::Creg => &mut self.cregs,
            OperandKind::Breg => &mut self.bregs,
            OperandKind::Qubit => unreachable!("register events only"),
        }
    }

    /// Step a register state machine for a `Write` event.
    fn on_write(&mut self, node: NodeIndex, operand_kind: OperandKind, reg: usize) {
        let state = self.reg_state(operand_kind);
        match state.last_event[reg] {
            RegEvent::Write => {
                let writer = state.last_writer[reg];
                self.add_dep(writer, node, DepKind::WriteAfterWrite, operand_kind, reg);
            }
            RegEvent::Read => {
                let readers = state.last_readers[reg].clone();
                for reader in readers {
                    self.add_dep(reader, node, DepKind::WriteAfterRead, operand_kind, reg);
                }
            }
        }
        let state = self.reg_state(operand_kind);
        state.last_writer[reg] = node;
        state.last_event[reg] = RegEvent::Write;
    }

    /// Step a register state machine for a `Read` event. Reads always
    /// commute: no read-after-read arcs are emitted.
    fn on_read(&mut self, node: NodeIndex, operand_kind: OperandKind, reg: usize) {
        let writer = self.reg_state(operand_kind).last_writer[reg];
        self.add_dep(writer, node, DepKind::ReadAfterWrite, operand_kind, reg);
        let state = self.reg_state(operand_kind);
        if state.last_event[reg] != RegEvent::Read {
            state.last_readers[reg].clear();
        }
        state.last_readers[reg].push(node);
        state.last_event[reg] = RegEvent::Read;
    }

    fn check_qubit(&self, gate: &Gate, qubit: usize) -> SchedResult<()> {
        if qubit >= self.last_q_event.len() {
            return Err(SchedError::OperandOutOfRange {
                domain: "qubit",
                index: qubit,
                count: self.last_q_event.len(),
                gate: gate.name.clone(),
            });
        }
        Ok(())
    }

    fn check_reg(&self, gate: &Gate, operand_kind: OperandKind, reg: usize) -> SchedResult<()> {
        let (count, domain) = match operand_kind {
            OperandKind::Creg => (self.cregs.last_event.len(), "creg"),
            OperandKind::Breg => (self.bregs.last_event.len(), "breg"),
            OperandKind::Qubit => unreachable!(),
        };
        if reg >= count {
            return Err(SchedError::OperandOutOfRange {
                domain,
                index: reg,
                count,
                gate: gate.name.clone(),
            });
        }
        Ok(())
    }

    /// Add a gate node and the arcs its events imply.
    fn add_gate(&mut self, index: usize, gate: &Gate) -> SchedResult<()> {
        let node = self.graph.add_node(NodeData {
            kind: NodeKind::Gate(index),
            duration_cycles: gate.duration_cycles(self.cycle_time),
            resource_exempt: matches!(
                gate.kind,
                GateKind::Dummy | GateKind::Classical | GateKind::Wait
            ),
        });
        self.nodes.push(node);

        // A conditional predicate reads its bit registers before the gate's
        // own events.
        if let Some(condition) = &gate.condition {
            for &breg in &condition.bregs {
                self.check_reg(gate, OperandKind::Breg, breg)?;
                self.on_read(node, OperandKind::Breg, breg);
            }
        }

        let name = gate.base_name();
        if name == "measure" {
            for &q in &gate.qubits {
                self.check_qubit(gate, q)?;
                self.on_default(node, q);
            }
            for &c in &gate.cregs {
                self.check_reg(gate, OperandKind::Creg, c)?;
                self.on_write(node, OperandKind::Creg, c);
            }
            for &b in &gate.bregs {
                self.check_reg(gate, OperandKind::Breg, b)?;
                self.on_write(node, OperandKind::Breg, b);
            }
        } else if name == "display" {
            // No explicit operands: touches every qubit and register.
            for q in 0..self.last_q_event.len() {
                self.on_default(node, q);
            }
            for c in 0..self.cregs.last_event.len() {
                self.on_write(node, OperandKind::Creg, c);
            }
            for b in 0..self.bregs.last_event.len() {
                self.on_write(node, OperandKind::Breg, b);
            }
        } else if gate.kind == GateKind::Classical {
            for &c in &gate.cregs {
                self.check_reg(gate, OperandKind::Creg, c)?;
                self.on_write(node, OperandKind::Creg, c);
            }
        } else if name == "cnot" {
            self.expect_operands(gate, 2)?;
            self.check_qubit(gate, gate.qubits[0])?;
            self.check_qubit(gate, gate.qubits[1])?;
            self.on_zrotate(node, gate.qubits[0], self.commute.multi_qubit);
            self.on_xrotate(node, gate.qubits[1], self.commute.multi_qubit);
        } else if name == "cz" || name == "cphase" {
            self.expect_operands(gate, 2)?;
            self.check_qubit(gate, gate.qubits[0])?;
            self.check_qubit(gate, gate.qubits[1])?;
            self.on_zrotate(node, gate.qubits[0], self.commute.multi_qubit);
            self.on_zrotate(node, gate.qubits[1], self.commute.multi_qubit);
        } else if Z_ROTATIONS.contains(&name) {
            self.expect_operands(gate, 1)?;
            self.check_qubit(gate, gate.qubits[0])?;
            self.on_zrotate(node, gate.qubits[0], self.commute.single_qubit);
        } else if X_ROTATIONS.contains(&name) {
            self.expect_operands(gate, 1)?;
            self.check_qubit(gate, gate.qubits[0])?;
            self.on_xrotate(node, gate.qubits[0], self.commute.single_qubit);
        } else {
            for &q in &gate.qubits {
                self.check_qubit(gate, q)?;
                self.on_default(node, q);
            }
            for &c in &gate.cregs {
                self.check_reg(gate, OperandKind::Creg, c)?;
                self.on_write(node, OperandKind::Creg, c);
            }
            for &b in &gate.bregs {
                self.check_reg(gate, OperandKind::Breg, b)?;
                self.on_write(node, OperandKind::Breg, b);
            }
        }
        Ok(())
    }

    fn expect_operands(&self, gate: &Gate, expected: usize) -> SchedResult<()> {
        if gate.qubits.len() != expected {
            return Err(SchedError::BadOperandCount {
                gate: gate.name.clone(),
                expected,
                got: gate.qubits.len(),
            });
        }
        Ok(())
    }

    /// Add the SINK node, closing every dependency chain.
    fn close(&mut self, kernel: &Kernel) -> SchedResult<NodeIndex> {
        let sink = self.graph.add_node(NodeData {
            kind: NodeKind::Sink,
            duration_cycles: 0,
            resource_exempt: true,
        });
        for q in 0..kernel.qubit_count {
            self.on_default(sink, q);
        }
        for c in 0..kernel.creg_count {
            self.on_write(sink, OperandKind::Creg, c);
        }
        for b in 0..kernel.breg_count {
            self.on_write(sink, OperandKind::Breg, b);
        }
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::{Condition, Gate, Kernel};

    fn kernel(gates: Vec<Gate>, qubits: usize, cregs: usize, bregs: usize) -> Kernel {
        let mut k = Kernel::new("test", qubits, cregs, bregs);
        for g in gates {
            k.push(g);
        }
        k
    }

    fn arcs_between(
        graph: &DependencyGraph,
        from: usize,
        to: usize,
    ) -> Vec<DepKind> {
        let (f, t) = (graph.node_of(from), graph.node_of(to));
        graph
            .graph()
            .edge_references()
            .filter(|e| e.source() == f && e.target() == t)
            .map(|e| e.weight().kind)
            .collect()
    }

    #[test]
    fn test_x_then_z_never_commute() {
        // x q0; z q0 with full commutation still orders X before Z.
        let k = kernel(
            vec![Gate::quantum("x", [0], 1), Gate::quantum("z", [0], 1)],
            1,
            0,
            0,
        );
        let g = DependencyGraph::build(
            &k,
            1,
            CommuteOptions {
                multi_qubit: true,
                single_qubit: true,
            },
        )
        .unwrap();
        let kinds = arcs_between(&g, 0, 1);
        assert_eq!(kinds, vec![DepKind::ZAfterX]);
        assert_eq!(g.graph()[g.graph().find_edge(g.node_of(0), g.node_of(1)).unwrap()].weight, 1);
    }

    #[test]
    fn test_zaz_suppressed_under_commutation() {
        let gates = vec![
            Gate::quantum("rz", [0], 1),
            Gate::quantum("rz", [0], 1),
            Gate::quantum("rz", [0], 1),
        ];
        let k = kernel(gates.clone(), 1, 0, 0);
        let commuting = DependencyGraph::build(
            &k,
            1,
            CommuteOptions {
                multi_qubit: false,
                single_qubit: true,
            },
        )
        .unwrap();
        assert!(arcs_between(&commuting, 0, 1).is_empty());
        assert!(arcs_between(&commuting, 1, 2).is_empty());

        let k = kernel(gates, 1, 0, 0);
        let strict = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap();
        assert_eq!(arcs_between(&strict, 0, 1), vec![DepKind::ZAfterZ]);
        assert_eq!(arcs_between(&strict, 1, 2), vec![DepKind::ZAfterZ]);
    }

    #[test]
    fn test_cnot_control_commutes_as_z() {
        // Two CNOTs sharing the control: ZAfterZ on q0 suppressed under
        // multi-qubit commutation.
        let gates = vec![
            Gate::quantum("cnot", [0, 1], 2),
            Gate::quantum("cnot", [0, 2], 2),
        ];
        let k = kernel(gates.clone(), 3, 0, 0);
        let commuting = DependencyGraph::build(
            &k,
            1,
            CommuteOptions {
                multi_qubit: true,
                single_qubit: false,
            },
        )
        .unwrap();
        assert!(arcs_between(&commuting, 0, 1).is_empty());

        let k = kernel(gates, 3, 0, 0);
        let strict = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap();
        assert_eq!(arcs_between(&strict, 0, 1), vec![DepKind::ZAfterZ]);
    }

    #[test]
    fn test_measure_writes_registers() {
        let k = kernel(
            vec![
                Gate::measure(0, 0, 0, 3),
                Gate::classical("add", [0], 1),
            ],
            1,
            1,
            1,
        );
        let g = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap();
        assert_eq!(
            arcs_between(&g, 0, 1),
            vec![DepKind::WriteAfterWrite]
        );
    }

    #[test]
    fn test_condition_reads_commute() {
        // Two gates conditioned on the same breg on different qubits carry
        // no mutual arc (read-after-read suppressed), but both order after
        // the measurement writing the breg.
        let k = kernel(
            vec![
                Gate::measure(0, 0, 0, 3),
                Gate::quantum("y", [1], 1).with_condition(Condition::unary(0)),
                Gate::quantum("y", [2], 1).with_condition(Condition::unary(0)),
            ],
            3,
            1,
            1,
        );
        let g = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap();
        assert!(arcs_between(&g, 1, 2).is_empty());
        assert_eq!(arcs_between(&g, 0, 1), vec![DepKind::ReadAfterWrite]);
        assert_eq!(arcs_between(&g, 0, 2), vec![DepKind::ReadAfterWrite]);
    }

    #[test]
    fn test_display_touches_everything() {
        let k = kernel(
            vec![
                Gate::quantum("x", [0], 1),
                Gate::quantum("display", [], 0),
            ],
            2,
            1,
            0,
        );
        let g = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap();
        // Display depends on the x via q0 and on SOURCE via q1/c0.
        assert_eq!(arcs_between(&g, 0, 1), vec![DepKind::DefaultAfterX]);
    }

    #[test]
    fn test_weight_is_duration_in_cycles() {
        let k = kernel(
            vec![Gate::quantum("q1", [0], 45), Gate::quantum("q2", [0], 20)],
            1,
            0,
            0,
        );
        let g = DependencyGraph::build(&k, 20, CommuteOptions::default()).unwrap();
        let e = g
            .graph()
            .find_edge(g.node_of(0), g.node_of(1))
            .unwrap();
        assert_eq!(g.graph()[e].weight, 3);
        assert_eq!(g.max_weight(), 3);
    }

    #[test]
    fn test_operand_out_of_range() {
        let k = kernel(vec![Gate::quantum("x", [1], 1)], 1, 0, 0);
        let err = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap_err();
        assert!(matches!(err, SchedError::OperandOutOfRange { .. }));
    }

    #[test]
    fn test_injected_cycle_detected() {
        let k = kernel(
            vec![Gate::quantum("a", [0], 1), Gate::quantum("b", [0], 1)],
            1,
            0,
            0,
        );
        let mut g = DependencyGraph::build(&k, 1, CommuteOptions::default()).unwrap();
        g.check_acyclic().unwrap();
        g.add_arc(
            g.node_of(1),
            g.node_of(0),
            DepKind::DefaultAfterDefault,
            OperandKind::Qubit,
            0,
        );
        // b -> a plus the constructed a -> b closes a cycle.
        assert!(matches!(
            g.check_acyclic(),
            Err(SchedError::GraphNotAcyclic)
        ));
    }

    #[test]
    fn test_sink_closes_all_chains() {
        let k = kernel(vec![Gate::quantum("x", [0], 40)], 2, 1, 0);
        let g = DependencyGraph::build(&k, 20, CommuteOptions::default()).unwrap();
        // SINK has incoming arcs from x (q0), SOURCE (q1, c0).
        let sink_preds = g.dependents(g.sink(), false);
        assert!(sink_preds.contains(&g.node_of(0)));
        assert!(sink_preds.contains(&g.source()));
        // The x -> SINK arc carries x's weight so SINK lands at latency.
        let e = g.graph().find_edge(g.node_of(0), g.sink()).unwrap();
        assert_eq!(g.graph()[e].weight, 2);
    }
}
