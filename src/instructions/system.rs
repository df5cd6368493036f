//! YIELD and HALT.

use crate::context::InstructionContext;
use crate::error::VmError;
use crate::types::StepStatus;

/// HALT: terminal. The ip stays on the HALT so a stray extra step halts again.
pub fn execute_halt(context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    context.instruction_pointer = context.instruction_address;
    Ok(StepStatus::Halted)
}

/// YIELD: ip is already past the opcode, so the next step resumes after it.
pub fn execute_yield(_context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    Ok(StepStatus::Yielded)
}
