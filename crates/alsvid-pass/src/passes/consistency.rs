//! Analysis pass running the IR consistency checker.

use std::fmt;

use alsvid_ir::{Program, consistency};

use crate::context::PassContext;
use crate::error::PassResult;
use crate::factory::Factory;
use crate::options::Options;
use crate::pass::{GroupFlag, PassImpl, PassNode};

/// Construct the consistency-check pass.
pub fn construct(type_name: String) -> Box<dyn PassImpl> {
    Box::new(ConsistencyPass { type_name })
}

/// Validates the structural invariants of the program without modifying
/// it: operand ranges, condition arity, control-flow pairing, and cycle
/// ordering for kernels that claim a valid schedule.
struct ConsistencyPass {
    type_name: String,
}

impl PassImpl for ConsistencyPass {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn dump_docs(&self, w: &mut dyn fmt::Write, prefix: &str) -> fmt::Result {
        writeln!(
            w,
            "{prefix}Checks the structural invariants of the program and fails \
             compilation on the first violation."
        )
    }

    fn declare_options(&self, _options: &mut Options) {}

    fn on_construct(
        &mut self,
        _factory: &Factory,
        _options: &Options,
        _children: &mut Vec<PassNode>,
    ) -> PassResult<GroupFlag> {
        Ok(GroupFlag::Leaf)
    }

    fn on_compile(&self, program: &mut Program, _ctx: &PassContext<'_>) -> PassResult<()> {
        consistency::check_program(program)?;
        Ok(())
    }
}
