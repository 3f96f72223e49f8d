//! The platform: topology, instruction catalog and hardware timing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PlatError, PlatResult};
use crate::instruction::InstructionSet;
use crate::topology::Topology;

/// Immutable description of the target hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// Platform name.
    pub name: String,
    /// Number of real qubits.
    pub qubit_count: usize,
    /// Number of classical registers.
    pub creg_count: usize,
    /// Number of bit registers.
    pub breg_count: usize,
    /// Cycle time in platform time units; durations divide by this.
    pub cycle_time: u64,
    /// The qubit topology.
    pub topology: Topology,
    /// The instruction-type catalog.
    pub instructions: InstructionSet,
}

impl Platform {
    /// Create a platform. The cycle time must be positive.
    pub fn new(
        name: impl Into<String>,
        qubit_count: usize,
        cycle_time: u64,
        topology: Topology,
        instructions: InstructionSet,
    ) -> PlatResult<Self> {
        if cycle_time == 0 {
            return Err(PlatError::shape("cycle_time", "must be positive"));
        }
        if topology.num_qubits() != qubit_count {
            return Err(PlatError::shape(
                "topology",
                format!(
                    "topology has {} qubits, platform declares {qubit_count}",
                    topology.num_qubits()
                ),
            ));
        }
        Ok(Self {
            name: name.into(),
            qubit_count,
            creg_count: 0,
            breg_count: 0,
            cycle_time,
            topology,
            instructions,
        })
    }

    /// Set the classical register count.
    #[must_use]
    pub fn with_cregs(mut self, creg_count: usize) -> Self {
        self.creg_count = creg_count;
        self
    }

    /// Set the bit register count.
    #[must_use]
    pub fn with_bregs(mut self, breg_count: usize) -> Self {
        self.breg_count = breg_count;
        self
    }

    /// Convenience constructor: a platform with full connectivity, an empty
    /// instruction catalog and unit cycle time. Mostly useful in tests.
    pub fn simple(name: impl Into<String>, qubit_count: usize) -> PlatResult<Self> {
        let topology = Topology::from_json(qubit_count, &Value::Object(Default::default()))?;
        Self::new(name, qubit_count, 1, topology, InstructionSet::new())
    }
}
