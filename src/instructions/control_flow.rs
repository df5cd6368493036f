//! CALL (absolute), CALL_IND and RET. Return addresses live on the data stack as 2 bytes.

use crate::config::ADDRESS_SIZE;
use crate::context::InstructionContext;
use crate::error::VmError;
use crate::types::StepStatus;

/// CALL target: push the address after the call instruction, then jump.
pub fn execute_call(context: &mut InstructionContext<'_>, target: u16) -> Result<StepStatus, VmError> {
    let return_address = context.instruction_pointer;
    context.push_value(u64::from(return_address), ADDRESS_SIZE)?;
    context.instruction_pointer = target;
    Ok(StepStatus::Continue)
}

/// CALL_IND: the target is popped from the stack; otherwise identical to CALL.
pub fn execute_call_indirect(context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    let target = context.pop_u16()?;
    execute_call(context, target)
}

pub fn execute_return(context: &mut InstructionContext<'_>) -> Result<StepStatus, VmError> {
    context.instruction_pointer = context.pop_u16()?;
    Ok(StepStatus::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn call_then_return_restores_ip_and_sp() {
        let mut memory = Memory::new(64).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.instruction_pointer = 0x0008;
        execute_call(&mut ctx, 0x0020).unwrap();
        assert_eq!(ctx.instruction_pointer, 0x0020);
        assert_eq!(ctx.stack_pointer, 62);
        execute_return(&mut ctx).unwrap();
        assert_eq!(ctx.instruction_pointer, 0x0008);
        assert_eq!(ctx.stack_pointer, 64);
    }

    #[test]
    fn indirect_call_replaces_target_slot_with_return_address() {
        let mut memory = Memory::new(64).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.push_value(0x0030, 2).unwrap();
        ctx.instruction_pointer = 0x0005;
        execute_call_indirect(&mut ctx).unwrap();
        assert_eq!(ctx.instruction_pointer, 0x0030);
        assert_eq!(ctx.stack_pointer, 62);
        assert_eq!(ctx.pop_u16().unwrap(), 0x0005);
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut memory = Memory::new(64).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        assert!(matches!(
            execute_return(&mut ctx),
            Err(VmError::StackUnderflow { .. })
        ));
    }
}
