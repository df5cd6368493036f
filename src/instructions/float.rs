//! Optional 32-bit floating-point group.
//!
//! FADD/FSUB/FMUL/FDIV pop `b` then `a` as f32 and push the result. Division by
//! zero yields 0.0 rather than a fault. CONVI/CONVF rewrite the top 4 bytes in
//! place without changing the stack depth.

use crate::config::FLOAT_SIZE;
use crate::context::InstructionContext;
use crate::decoder::FloatOp;
use crate::error::VmError;
use crate::types::{Flags, StepStatus};

fn pop_f32(context: &mut InstructionContext<'_>) -> Result<f32, VmError> {
    Ok(f32::from_bits(context.pop_value(FLOAT_SIZE)? as u32))
}

fn top_bits(context: &InstructionContext<'_>) -> Result<u32, VmError> {
    let b = context.peek_bytes(0, FLOAT_SIZE)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn replace_top(context: &mut InstructionContext<'_>, bits: u32) -> Result<(), VmError> {
    context
        .memory
        .write(context.stack_pointer, &bits.to_le_bytes())
}

pub fn execute_float(context: &mut InstructionContext<'_>, op: FloatOp) -> Result<StepStatus, VmError> {
    let b = pop_f32(context)?;
    let a = pop_f32(context)?;
    let result = match op {
        FloatOp::Add => a + b,
        FloatOp::Sub => a - b,
        FloatOp::Mul => a * b,
        FloatOp::Div => {
            if b == 0.0 {
                0.0
            } else {
                a / b
            }
        }
    };
    context.flags = Flags::from_conditions(result == 0.0, result < 0.0);
    context.push_value(u64::from(result.to_bits()), FLOAT_SIZE)?;
    Ok(StepStatus::Continue)
}

/// CONVI: f32 on top -> u32, truncating toward zero. Negatives clamp to 0, NaN -> 0.
pub fn execute_convert_to_int(context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    let value = f32::from_bits(top_bits(context)?);
    replace_top(context, value as u32)?;
    Ok(StepStatus::Continue)
}

/// CONVF: u32 on top -> f32.
pub fn execute_convert_to_float(context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    let value = top_bits(context)?;
    replace_top(context, (value as f32).to_bits())?;
    Ok(StepStatus::Continue)
}
