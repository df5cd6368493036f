//! BRANCH family. The displacement is relative to the already-advanced ip.
//!
//! The condition source is fixed per machine: either the flags register, or a
//! signed 32-bit value popped and compared against zero. Unconditional branches
//! never touch the stack.

use crate::config::{BranchCondition, BRANCH_VALUE_SIZE};
use crate::context::InstructionContext;
use crate::decoder::Condition;
use crate::error::VmError;
use crate::types::StepStatus;

pub fn execute_branch(
    context: &mut InstructionContext<'_>,
    condition: Condition,
    displacement: i16,
) -> Result<StepStatus, VmError> {
    let target = context.instruction_pointer.wrapping_add_signed(displacement);
    let taken = match (condition, context.branch_condition) {
        (Condition::Always, _) => true,
        (_, BranchCondition::Flags) => {
            condition.holds(context.flags.zero(), context.flags.negative())
        }
        (_, BranchCondition::StackValue) => {
            let value = context.pop_value(BRANCH_VALUE_SIZE)? as u32 as i32;
            condition.holds(value == 0, value < 0)
        }
    };
    if taken {
        context.instruction_pointer = target;
    }
    Ok(StepStatus::Continue)
}
