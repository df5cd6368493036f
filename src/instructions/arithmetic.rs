//! Integer ALU. Pops `b` then `a` (only `a` for NOT), computes in a 64-bit
//! accumulator, masks the result to the operand width, pushes it and
//! recomputes Zero/Negative from the masked value.

use crate::context::InstructionContext;
use crate::decoder::AluOp;
use crate::error::VmError;
use crate::instructions::base::{sign_bit, width_mask};
use crate::instructions::bitwise;
use crate::types::{Flags, StepStatus};

/// Wrapping arithmetic; `None` on integer division or modulo by zero.
fn apply(op: AluOp, a: u64, b: u64) -> Option<u64> {
    match op {
        AluOp::Add => Some(a.wrapping_add(b)),
        AluOp::Sub => Some(a.wrapping_sub(b)),
        AluOp::Mul => Some(a.wrapping_mul(b)),
        AluOp::Div => a.checked_div(b),
        AluOp::Mod => a.checked_rem(b),
        _ => bitwise::apply(op, a, b),
    }
}

pub fn execute_arithmetic(
    context: &mut InstructionContext<'_>,
    width: usize,
    op: AluOp,
) -> Result<StepStatus, VmError> {
    let b = if op.is_unary() {
        0
    } else {
        context.pop_value(width)?
    };
    let a = context.pop_value(width)?;
    let result = apply(op, a, b).ok_or(VmError::DivisionByZero {
        address: context.instruction_address,
    })? & width_mask(width);
    context.flags = Flags::from_conditions(result == 0, sign_bit(result, width));
    context.push_value(result, width)?;
    Ok(StepStatus::Continue)
}
