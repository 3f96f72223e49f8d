//! Instruction-type catalog of a platform.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use alsvid_ir::{Gate, GateKind};

use crate::error::{PlatError, PlatResult};

/// A platform instruction type: the template a gate is instantiated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionType {
    /// Operation name, without specialization suffix.
    pub name: String,
    /// Classification of gates of this type.
    pub kind: GateKind,
    /// Duration in platform time units.
    pub duration: u64,
    /// Declared qubit operand count, when fixed.
    pub qubit_count: Option<usize>,
}

impl InstructionType {
    /// Create a quantum instruction type.
    pub fn quantum(name: impl Into<String>, duration: u64, qubit_count: usize) -> Self {
        Self {
            name: name.into(),
            kind: GateKind::Quantum,
            duration,
            qubit_count: Some(qubit_count),
        }
    }

    /// Create a classical instruction type.
    pub fn classical(name: impl Into<String>, duration: u64) -> Self {
        Self {
            name: name.into(),
            kind: GateKind::Classical,
            duration,
            qubit_count: None,
        }
    }
}

/// Name-indexed catalog of instruction types.
///
/// Lookup strips specialization suffixes: `"rz 1.5708"` resolves to the
/// `"rz"` entry when no exact match exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstructionSet {
    types: FxHashMap<String, InstructionType>,
}

impl InstructionSet {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from instruction types.
    pub fn from_types(types: impl IntoIterator<Item = InstructionType>) -> Self {
        let mut set = Self::new();
        for t in types {
            set.insert(t);
        }
        set
    }

    /// Insert a type, replacing any previous entry with the same name.
    pub fn insert(&mut self, instruction: InstructionType) {
        self.types.insert(instruction.name.clone(), instruction);
    }

    /// Look up a type by name, falling back to the base name with any
    /// specialization suffix stripped.
    pub fn find(&self, name: &str) -> Option<&InstructionType> {
        if let Some(t) = self.types.get(name) {
            return Some(t);
        }
        let base = name.split(' ').next().unwrap_or(name);
        self.types.get(base)
    }

    /// Duration of the named instruction, if known.
    pub fn duration_of(&self, name: &str) -> Option<u64> {
        self.find(name).map(|t| t.duration)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Instantiate a gate of the named type on the given qubits, with the
    /// catalog duration and classification.
    pub fn gate(
        &self,
        name: &str,
        qubits: impl IntoIterator<Item = usize>,
    ) -> PlatResult<Gate> {
        let t = self.find(name).ok_or_else(|| PlatError::UnknownInstruction {
            name: name.into(),
        })?;
        let mut gate = Gate::quantum(name, qubits, t.duration);
        gate.kind = t.kind;
        Ok(gate)
    }
}
