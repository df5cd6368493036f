//! Stack manipulation: POP, DUP, DIG.
//!
//! DUP and DIG work on a window of `width + depth` bytes at the top of the stack.
//! DUP copies the top value to just beneath the `depth` bytes under it (plain
//! duplicate at depth 0); DIG copies the value `depth` bytes down to a new top slot.

use crate::context::InstructionContext;
use crate::error::VmError;
use crate::types::StepStatus;

/// POP: discard `width` bytes.
pub fn execute_pop(context: &mut InstructionContext<'_>, width: usize) -> Result<StepStatus, VmError> {
    context.peek_bytes(0, width)?;
    context.stack_pointer += width;
    Ok(StepStatus::Continue)
}

/// DUP: `[T, K..] -> [T, K.., T]`, reading top-down; the stack grows by `width`.
pub fn execute_dup(
    context: &mut InstructionContext<'_>,
    width: usize,
    depth: u8,
) -> Result<StepStatus, VmError> {
    let depth = usize::from(depth);
    let window = context.peek_bytes(0, width + depth)?;
    let mut rewritten = Vec::with_capacity(2 * width + depth);
    rewritten.extend_from_slice(window);
    rewritten.extend_from_slice(&window[..width]);
    context.reserve(width)?;
    context
        .memory
        .write(context.stack_pointer, &rewritten)?;
    Ok(StepStatus::Continue)
}

/// DIG: push a copy of the `width`-byte value that sits `depth` bytes below the top.
pub fn execute_dig(
    context: &mut InstructionContext<'_>,
    width: usize,
    depth: u8,
) -> Result<StepStatus, VmError> {
    let value = context.peek_bytes(usize::from(depth), width)?.to_vec();
    context.push_bytes(&value)?;
    Ok(StepStatus::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn stack_bytes(context: &InstructionContext<'_>) -> Vec<u8> {
        context.memory.as_slice()[context.stack_pointer..context.stack_base].to_vec()
    }

    #[test]
    fn dup_depth_zero_duplicates_top() {
        let mut memory = Memory::new(32).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.push_value(0x0102, 2).unwrap();
        execute_dup(&mut ctx, 2, 0).unwrap();
        assert_eq!(stack_bytes(&ctx), vec![0x02, 0x01, 0x02, 0x01]);
    }

    #[test]
    fn dup_with_depth_tucks_copy_below_gap() {
        let mut memory = Memory::new(32).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.push_value(0xcc, 1).unwrap();
        ctx.push_value(0xbb, 1).unwrap();
        ctx.push_value(0xaa, 1).unwrap();
        ctx.push_value(0x77, 1).unwrap();
        // top-down: 77 aa bb cc
        execute_dup(&mut ctx, 1, 2).unwrap();
        assert_eq!(stack_bytes(&ctx), vec![0x77, 0xaa, 0xbb, 0x77, 0xcc]);
    }

    #[test]
    fn dig_copies_deeper_value_to_top() {
        let mut memory = Memory::new(32).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.push_value(0x1111, 2).unwrap();
        ctx.push_value(0x2222, 2).unwrap();
        execute_dig(&mut ctx, 2, 2).unwrap();
        assert_eq!(ctx.pop_value(2).unwrap(), 0x1111);
        assert_eq!(ctx.pop_value(2).unwrap(), 0x2222);
        assert_eq!(ctx.pop_value(2).unwrap(), 0x1111);
    }

    #[test]
    fn dig_past_stack_base_underflows() {
        let mut memory = Memory::new(32).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.push_value(1, 1).unwrap();
        assert!(matches!(
            execute_dig(&mut ctx, 1, 1),
            Err(VmError::StackUnderflow { .. })
        ));
        assert_eq!(ctx.stack_pointer, 31);
    }

    #[test]
    fn pop_discards_width_bytes() {
        let mut memory = Memory::new(32).unwrap();
        let mut ctx = InstructionContext::for_tests(&mut memory);
        ctx.push_value(5, 4).unwrap();
        execute_pop(&mut ctx, 4).unwrap();
        assert_eq!(ctx.stack_pointer, 32);
        assert!(execute_pop(&mut ctx, 1).is_err());
    }
}
