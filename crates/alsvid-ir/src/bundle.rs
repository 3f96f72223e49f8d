//! Bundles: the gates sharing one cycle after scheduling.
//!
//! Backends consume a scheduled circuit as a list of bundles rather than a
//! flat gate sequence. Bundling is a single scan over a cycles-valid
//! circuit; wait and dummy gates are padding and do not appear in bundles.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{Cycle, GateKind};
use crate::kernel::Kernel;

/// The set of gates starting at one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// The cycle at which every gate of the bundle starts.
    pub start_cycle: Cycle,
    /// Duration of the longest gate in the bundle, in cycles.
    pub duration_cycles: u64,
    /// Indices into the kernel's circuit, in circuit order.
    pub gates: Vec<usize>,
}

/// Group a scheduled kernel's gates into bundles, one per occupied cycle.
///
/// The kernel must claim valid cycles; an out-of-order or unscheduled gate
/// is an error. Wait and dummy gates are skipped.
pub fn bundler(kernel: &Kernel, cycle_time: u64) -> IrResult<Vec<Bundle>> {
    let mut bundles: Vec<Bundle> = vec![];
    let mut current: Option<Bundle> = None;

    for (index, gate) in kernel.circuit.iter().enumerate() {
        if matches!(gate.kind, GateKind::Wait | GateKind::Dummy) {
            continue;
        }
        let Some(cycle) = gate.cycle else {
            return Err(IrError::CycleNotSet {
                kernel: kernel.name.clone(),
                gate: gate.name.clone(),
            });
        };
        let duration = gate.duration_cycles(cycle_time);

        match &mut current {
            Some(bundle) if bundle.start_cycle == cycle => {
                bundle.gates.push(index);
                bundle.duration_cycles = bundle.duration_cycles.max(duration);
            }
            Some(bundle) => {
                if cycle < bundle.start_cycle {
                    return Err(IrError::CyclesOutOfOrder {
                        kernel: kernel.name.clone(),
                        gate: gate.name.clone(),
                        position: index,
                    });
                }
                bundles.push(current.take().expect("checked above"));
                current = Some(Bundle {
                    start_cycle: cycle,
                    duration_cycles: duration,
                    gates: vec![index],
                });
            }
            None => {
                current = Some(Bundle {
                    start_cycle: cycle,
                    duration_cycles: duration,
                    gates: vec![index],
                });
            }
        }
    }
    if let Some(bundle) = current {
        bundles.push(bundle);
    }
    Ok(bundles)
}

/// Write the bundle cycles back into the kernel's circuit. The inverse of
/// [`bundler`] for the gates it covers; the circuit order already matches
/// the bundle order, so the cycles-valid invariant is restored directly.
pub fn circuiter(kernel: &mut Kernel, bundles: &[Bundle]) {
    for bundle in bundles {
        for &index in &bundle.gates {
            if let Some(gate) = kernel.circuit.get_mut(index) {
                gate.cycle = Some(bundle.start_cycle);
            }
        }
    }
    kernel.circuit.sort_by_cycle();
    kernel.cycles_valid = true;
}

/// Schedule depth of a bundle list: from the first bundle's start to the
/// cycle the machine starts idling after the last one. Empty lists have
/// depth 0.
pub fn depth(bundles: &[Bundle]) -> u64 {
    match (bundles.first(), bundles.last()) {
        (Some(first), Some(last)) => {
            last.start_cycle + last.duration_cycles - first.start_cycle
        }
        _ => 0,
    }
}
