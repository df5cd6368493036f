//! Instruction set: one module per family, dispatched over the decoded `Operation`.

pub mod arithmetic;
pub mod base;
pub mod bitwise;
pub mod branching;
pub mod control_flow;
pub mod float;
pub mod memory;
pub mod stack;
pub mod system;

use crate::context::InstructionContext;
use crate::decoder::Operation;
use crate::error::VmError;
use crate::types::StepStatus;

/// Execute one decoded operation against the working context.
pub fn execute(operation: Operation, context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    match operation {
        Operation::Load { width, mode } => memory::execute_load(context, width, mode),
        Operation::Store { width, mode } => memory::execute_store(context, width, mode),
        Operation::Pop { width } => stack::execute_pop(context, width),
        Operation::Dup { width, depth } => stack::execute_dup(context, width, depth),
        Operation::Dig { width, depth } => stack::execute_dig(context, width, depth),
        Operation::Call { target } => control_flow::execute_call(context, target),
        Operation::CallIndirect => control_flow::execute_call_indirect(context),
        Operation::Return => control_flow::execute_return(context),
        Operation::Arithmetic { width, op } => arithmetic::execute_arithmetic(context, width, op),
        Operation::Float(op) => float::execute_float(context, op),
        Operation::ConvertToInt => float::execute_convert_to_int(context),
        Operation::ConvertToFloat => float::execute_convert_to_float(context),
        Operation::Branch {
            condition,
            displacement,
        } => branching::execute_branch(context, condition, displacement),
        Operation::Yield => system::execute_yield(context),
        Operation::Halt => system::execute_halt(context),
    }
}
