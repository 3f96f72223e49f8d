//! The scheduling pass: cycle assignment for every kernel of the program.

use std::fmt;

use alsvid_ir::Program;
use alsvid_sched::{
    CommuteOptions, QubitBusyModel, ResourceManager, SchedulerTarget, schedule_kernel,
};

use crate::context::PassContext;
use crate::error::{PassError, PassResult};
use crate::factory::Factory;
use crate::options::Options;
use crate::pass::{GroupFlag, PassImpl, PassNode};

/// Construct the standard scheduling pass.
pub fn construct(type_name: String) -> Box<dyn PassImpl> {
    Box::new(SchedulePass {
        type_name,
        greedy: false,
    })
}

/// Construct the experimental greedy variant: always ASAP with resource
/// constraints, ignoring the target option.
pub fn construct_greedy(type_name: String) -> Box<dyn PassImpl> {
    Box::new(SchedulePass {
        type_name,
        greedy: true,
    })
}

/// Builds the dependency graph of each kernel and assigns cycles, ASAP,
/// ALAP or uniform, optionally against the qubit-busy resource model.
struct SchedulePass {
    type_name: String,
    greedy: bool,
}

impl PassImpl for SchedulePass {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn dump_docs(&self, w: &mut dyn fmt::Write, prefix: &str) -> fmt::Result {
        if self.greedy {
            writeln!(
                w,
                "{prefix}Experimental greedy list scheduler: always schedules ASAP \
                 against the qubit-busy resource model."
            )
        } else {
            writeln!(
                w,
                "{prefix}Assigns a cycle to every gate of every kernel using the \
                 critical-path list scheduler, and sorts each circuit by cycle."
            )
        }
    }

    fn declare_options(&self, options: &mut Options) {
        options.add_enum(
            "scheduler_target",
            "which schedule to produce",
            "alap",
            &["asap", "alap", "uniform"],
        );
        options.add_bool(
            "resource_constraints",
            "respect machine resource reservations",
            false,
        );
        options.add_bool(
            "commute_multi_qubit",
            "allow commutation of same-axis multi-qubit gate operands",
            false,
        );
        options.add_bool(
            "commute_single_qubit",
            "allow commutation of same-axis single-qubit rotations",
            false,
        );
    }

    fn on_construct(
        &mut self,
        _factory: &Factory,
        _options: &Options,
        _children: &mut Vec<PassNode>,
    ) -> PassResult<GroupFlag> {
        Ok(GroupFlag::Leaf)
    }

    fn on_compile(&self, program: &mut Program, ctx: &PassContext<'_>) -> PassResult<()> {
        let (target, resource_constrained) = if self.greedy {
            (SchedulerTarget::Asap, true)
        } else {
            let target = match ctx.options.get("scheduler_target")?.as_str() {
                "asap" => SchedulerTarget::Asap,
                "uniform" => SchedulerTarget::Uniform,
                _ => SchedulerTarget::Alap,
            };
            (target, ctx.options.get("resource_constraints")?.as_bool())
        };
        let commute = CommuteOptions {
            multi_qubit: ctx.options.get("commute_multi_qubit")?.as_bool(),
            single_qubit: ctx.options.get("commute_single_qubit")?.as_bool(),
        };

        // Work on a copy so cancellation leaves the program untouched.
        let mut kernels = program.kernels.clone();
        for kernel in &mut kernels {
            if ctx.cancel.is_cancelled() {
                return Err(PassError::Cancelled);
            }
            let mut model;
            let rm: Option<&mut dyn ResourceManager> = if resource_constrained {
                model = QubitBusyModel::new(ctx.platform.qubit_count, ctx.platform.cycle_time);
                Some(&mut model)
            } else {
                None
            };
            schedule_kernel(kernel, ctx.platform.cycle_time, target, commute, rm)?;
        }
        program.kernels = kernels;
        Ok(())
    }
}
