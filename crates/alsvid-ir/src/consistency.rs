//! Structural consistency checking for programs and kernels.
//!
//! The checker validates the invariants that the rest of the stack relies
//! on but does not re-verify on every operation: operand indices in range,
//! condition arity, control-flow pairing across kernels, and cycle ordering
//! for kernels that claim a valid schedule. It reports the first violation
//! found, annotated with program, kernel and gate context.

use rustc_hash::FxHashSet;

use crate::error::{IrError, IrResult};
use crate::gate::{Condition, Gate};
use crate::kernel::{Kernel, KernelKind, Program};

/// Check a whole program: every kernel individually, name uniqueness, the
/// register bounds, and the balance of control-flow marker kernels.
pub fn check_program(program: &Program) -> IrResult<()> {
    let mut names = FxHashSet::default();
    for kernel in &program.kernels {
        if !names.insert(kernel.name.as_str()) {
            return Err(IrError::DuplicateKernelName {
                name: kernel.name.clone(),
            });
        }
        check_register_bounds(program, kernel)?;
        check_kernel(kernel)?;
        // Control-flow predicates read program-level bit registers; marker
        // kernels usually declare none of their own.
        if let Some(condition) = &kernel.condition {
            for &breg in &condition.bregs {
                if breg >= program.breg_count {
                    return Err(IrError::BregOutOfRange {
                        breg,
                        count: program.breg_count,
                        gate: kernel.name.clone(),
                        kernel: kernel.name.clone(),
                    });
                }
            }
        }
    }
    check_control_flow(program)?;
    Ok(())
}

/// Check one kernel in isolation: kind/condition pairing, per-gate operand
/// validity, and cycle ordering when the kernel claims valid cycles.
pub fn check_kernel(kernel: &Kernel) -> IrResult<()> {
    check_kernel_condition(kernel)?;
    for gate in &kernel.circuit {
        check_gate(kernel, gate)?;
    }
    if kernel.cycles_valid {
        check_cycle_order(kernel)?;
    }
    Ok(())
}

fn check_register_bounds(program: &Program, kernel: &Kernel) -> IrResult<()> {
    let bounds = [
        ("qubit", kernel.qubit_count, program.qubit_count),
        ("creg", kernel.creg_count, program.creg_count),
        ("breg", kernel.breg_count, program.breg_count),
    ];
    for (register, declared, allowed) in bounds {
        if declared > allowed {
            return Err(IrError::RegisterCountExceeded {
                kernel: kernel.name.clone(),
                register,
                declared,
                allowed,
            });
        }
    }
    Ok(())
}

fn check_kernel_condition(kernel: &Kernel) -> IrResult<()> {
    if kernel.kind.requires_condition() && kernel.condition.is_none() {
        return Err(IrError::MissingCondition {
            kernel: kernel.name.clone(),
            kind: kernel.kind.name().into(),
        });
    }
    if kernel.kind.forbids_condition() && kernel.condition.is_some() {
        return Err(IrError::UnexpectedCondition {
            kernel: kernel.name.clone(),
            kind: kernel.kind.name().into(),
        });
    }
    if let Some(condition) = &kernel.condition {
        // Arity only; the operand range is a program-level concern.
        let expected = condition.comparator.operand_count();
        if condition.bregs.len() != expected {
            return Err(IrError::ConditionArity {
                comparator: condition.comparator,
                expected,
                got: condition.bregs.len(),
                context: kernel.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_gate(kernel: &Kernel, gate: &Gate) -> IrResult<()> {
    let mut seen = FxHashSet::default();
    for &qubit in &gate.qubits {
        if qubit >= kernel.qubit_count {
            return Err(IrError::QubitOutOfRange {
                qubit,
                count: kernel.qubit_count,
                gate: gate.name.clone(),
                kernel: kernel.name.clone(),
            });
        }
        if !seen.insert(qubit) {
            return Err(IrError::DuplicateQubit {
                qubit,
                gate: gate.name.clone(),
                kernel: kernel.name.clone(),
            });
        }
    }
    for &creg in &gate.cregs {
        if creg >= kernel.creg_count {
            return Err(IrError::CregOutOfRange {
                creg,
                count: kernel.creg_count,
                gate: gate.name.clone(),
                kernel: kernel.name.clone(),
            });
        }
    }
    for &breg in &gate.bregs {
        if breg >= kernel.breg_count {
            return Err(IrError::BregOutOfRange {
                breg,
                count: kernel.breg_count,
                gate: gate.name.clone(),
                kernel: kernel.name.clone(),
            });
        }
    }
    if let Some(condition) = &gate.condition {
        check_condition(condition, kernel.breg_count, &gate.name, kernel)?;
    }
    Ok(())
}

fn check_condition(
    condition: &Condition,
    breg_count: usize,
    context: &str,
    kernel: &Kernel,
) -> IrResult<()> {
    let expected = condition.comparator.operand_count();
    if condition.bregs.len() != expected {
        return Err(IrError::ConditionArity {
            comparator: condition.comparator,
            expected,
            got: condition.bregs.len(),
            context: context.into(),
        });
    }
    for &breg in &condition.bregs {
        if breg >= breg_count {
            return Err(IrError::BregOutOfRange {
                breg,
                count: breg_count,
                gate: context.into(),
                kernel: kernel.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_cycle_order(kernel: &Kernel) -> IrResult<()> {
    let mut prev = None;
    for (position, gate) in kernel.circuit.iter().enumerate() {
        let Some(cycle) = gate.cycle else {
            return Err(IrError::CycleNotSet {
                kernel: kernel.name.clone(),
                gate: gate.name.clone(),
            });
        };
        if let Some(prev) = prev {
            if cycle < prev {
                return Err(IrError::CyclesOutOfOrder {
                    kernel: kernel.name.clone(),
                    gate: gate.name.clone(),
                    position,
                });
            }
        }
        prev = Some(cycle);
    }
    Ok(())
}

/// Check that control-flow marker kernels pair and nest properly across the
/// program: every start marker must be closed by its matching end marker,
/// in properly nested order, and an else branch must immediately follow the
/// if branch it complements.
fn check_control_flow(program: &Program) -> IrResult<()> {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Open {
        For,
        DoWhile,
        If,
        Else,
    }

    fn pop(
        stack: &mut Vec<(Open, String)>,
        expected: Open,
        expected_name: &str,
        kernel: &str,
    ) -> IrResult<()> {
        match stack.pop() {
            Some((open, _)) if open == expected => Ok(()),
            Some((_, unclosed)) => Err(IrError::UnbalancedControlFlow {
                kernel: kernel.into(),
                detail: format!(
                    "expected to close {expected_name}, but '{unclosed}' is still open"
                ),
            }),
            None => Err(IrError::UnbalancedControlFlow {
                kernel: kernel.into(),
                detail: format!("no matching {expected_name}"),
            }),
        }
    }

    let mut stack: Vec<(Open, String)> = vec![];
    let mut last_closed_if = false;
    for kernel in &program.kernels {
        let name = kernel.name.as_str();
        let mut closes_if = false;
        match kernel.kind {
            KernelKind::Static => {}
            KernelKind::ForStart { .. } => stack.push((Open::For, name.into())),
            KernelKind::DoWhileStart => stack.push((Open::DoWhile, name.into())),
            KernelKind::IfStart => stack.push((Open::If, name.into())),
            KernelKind::ElseStart => {
                if !last_closed_if {
                    return Err(IrError::UnbalancedControlFlow {
                        kernel: name.into(),
                        detail: "else-start does not follow an if-end".into(),
                    });
                }
                stack.push((Open::Else, name.into()));
            }
            KernelKind::ForEnd => pop(&mut stack, Open::For, "for-start", name)?,
            KernelKind::DoWhileEnd => {
                pop(&mut stack, Open::DoWhile, "do-while-start", name)?;
            }
            KernelKind::IfEnd => {
                pop(&mut stack, Open::If, "if-start", name)?;
                closes_if = true;
            }
            KernelKind::ElseEnd => pop(&mut stack, Open::Else, "else-start", name)?,
        }
        last_closed_if = closes_if;
    }
    if let Some((_, name)) = stack.last() {
        return Err(IrError::UnbalancedControlFlow {
            kernel: name.clone(),
            detail: "start marker is never closed".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Comparator, Condition, Gate};
    use crate::kernel::{Kernel, KernelKind, Program};

    fn program_with(kernel: Kernel) -> Program {
        let mut p = Program::new("p", 8, 8, 8);
        p.add_kernel(kernel).unwrap();
        p
    }

    #[test]
    fn test_operand_range_checked() {
        let mut k = Kernel::new("k", 2, 0, 0);
        k.push(Gate::quantum("x", [2], 20));
        let err = check_program(&program_with(k)).unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { qubit: 2, .. }));
    }

    #[test]
    fn test_duplicate_qubit_operand_rejected() {
        let mut k = Kernel::new("k", 2, 0, 0);
        k.push(Gate::quantum("cz", [1, 1], 40));
        let err = check_program(&program_with(k)).unwrap_err();
        assert!(matches!(err, IrError::DuplicateQubit { qubit: 1, .. }));
    }

    #[test]
    fn test_condition_arity_checked() {
        let mut k = Kernel::new("k", 1, 0, 2);
        k.push(
            Gate::quantum("x", [0], 20)
                .with_condition(Condition::new(Comparator::And, [0])),
        );
        let err = check_program(&program_with(k)).unwrap_err();
        assert!(matches!(
            err,
            IrError::ConditionArity {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_cycle_order_checked_when_valid() {
        let mut k = Kernel::new("k", 2, 0, 0);
        let mut a = Gate::quantum("a", [0], 20);
        a.cycle = Some(4);
        let mut b = Gate::quantum("b", [1], 20);
        b.cycle = Some(2);
        k.circuit.push(a);
        k.circuit.push(b);
        k.cycles_valid = true;
        let err = check_program(&program_with(k)).unwrap_err();
        assert!(matches!(err, IrError::CyclesOutOfOrder { position: 1, .. }));
    }

    #[test]
    fn test_unscheduled_ok_when_cycles_not_claimed() {
        let mut k = Kernel::new("k", 2, 0, 0);
        k.push(Gate::quantum("x", [0], 20));
        check_program(&program_with(k)).unwrap();
    }

    #[test]
    fn test_control_flow_balance() {
        let mut p = Program::new("p", 2, 0, 2);
        p.add_kernel(Kernel::control_flow(
            "if",
            KernelKind::IfStart,
            Some(Condition::unary(0)),
        ))
        .unwrap();
        p.add_kernel(Kernel::new("body", 2, 0, 0)).unwrap();
        let err = check_program(&p).unwrap_err();
        assert!(matches!(err, IrError::UnbalancedControlFlow { .. }));

        p.add_kernel(Kernel::control_flow("fi", KernelKind::IfEnd, None))
            .unwrap();
        check_program(&p).unwrap();
    }

    #[test]
    fn test_else_requires_preceding_if_end() {
        let mut p = Program::new("p", 2, 0, 2);
        p.add_kernel(Kernel::control_flow(
            "else",
            KernelKind::ElseStart,
            Some(Condition::unary(0)),
        ))
        .unwrap();
        let err = check_program(&p).unwrap_err();
        assert!(matches!(err, IrError::UnbalancedControlFlow { .. }));
    }

    #[test]
    fn test_missing_loop_condition_rejected() {
        let mut p = Program::new("p", 2, 0, 2);
        p.add_kernel(Kernel::control_flow("do", KernelKind::DoWhileStart, None))
            .unwrap();
        p.add_kernel(Kernel::control_flow("od", KernelKind::DoWhileEnd, None))
            .unwrap();
        let err = check_program(&p).unwrap_err();
        assert!(matches!(err, IrError::MissingCondition { .. }));
    }
}
