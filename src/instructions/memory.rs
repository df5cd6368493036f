//! LOAD / STORE and the addressing unit they share.
//!
//! Direct: inline absolute address. Indexed-byte: base popped from the stack
//! plus inline byte. Indexed-word: signed offset popped first, then base.
//! Immediate (LOAD only): the value follows the opcode.

use crate::context::InstructionContext;
use crate::decoder::AddressingMode;
use crate::error::VmError;
use crate::instructions::base::{bytes_to_value_le, offset_address};
use crate::types::{MemoryAccess, StepStatus};

/// Pop whatever the mode keeps on the stack and return the effective address.
/// `Immediate` has no address and is handled by the caller.
fn resolve_address(context: &mut InstructionContext<'_>, mode: AddressingMode) -> Result<u16, VmError> {
    match mode {
        AddressingMode::Direct(address) => Ok(address),
        AddressingMode::IndexedByte(offset) => {
            let base = context.pop_u16()?;
            Ok(base.wrapping_add(u16::from(offset)))
        }
        AddressingMode::IndexedWord => {
            let offset = context.pop_u16()? as i16;
            let base = context.pop_u16()?;
            Ok(offset_address(base, offset))
        }
        // Only LOAD decodes an immediate, and it never asks for an address.
        AddressingMode::Immediate(_) => Err(VmError::UnknownOpcode {
            opcode: context.opcode,
            address: context.instruction_address,
        }),
    }
}

/// LOAD: push `width` bytes from the effective address (or the inline immediate).
pub fn execute_load(
    context: &mut InstructionContext<'_>,
    width: usize,
    mode: AddressingMode,
) -> Result<StepStatus, VmError> {
    if let AddressingMode::Immediate(value) = mode {
        context.push_value(value, width)?;
        return Ok(StepStatus::Continue);
    }
    let address = resolve_address(context, mode)?;
    let bytes = context.memory.read(usize::from(address), width)?.to_vec();
    context.last_load = Some(MemoryAccess {
        address,
        value: bytes_to_value_le(&bytes),
    });
    context.push_bytes(&bytes)?;
    Ok(StepStatus::Continue)
}

/// STORE: pop `width` bytes, then the address operands beneath them, and write.
pub fn execute_store(
    context: &mut InstructionContext<'_>,
    width: usize,
    mode: AddressingMode,
) -> Result<StepStatus, VmError> {
    let bytes = context.peek_bytes(0, width)?.to_vec();
    context.stack_pointer += width;
    let address = resolve_address(context, mode)?;
    context.memory.write(usize::from(address), &bytes)?;
    context.last_store = Some(MemoryAccess {
        address,
        value: bytes_to_value_le(&bytes),
    });
    Ok(StepStatus::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn context(memory: &mut Memory) -> InstructionContext<'_> {
        InstructionContext::for_tests(memory)
    }

    #[test]
    fn direct_load_pushes_memory_value() {
        let mut memory = Memory::new(64).unwrap();
        memory.write(0x10, &[0x34, 0x12]).unwrap();
        let mut ctx = context(&mut memory);
        execute_load(&mut ctx, 2, AddressingMode::Direct(0x10)).unwrap();
        assert_eq!(ctx.stack_pointer, 62);
        assert_eq!(ctx.pop_value(2).unwrap(), 0x1234);
        assert_eq!(
            ctx.last_load,
            Some(MemoryAccess {
                address: 0x10,
                value: 0x1234
            })
        );
    }

    #[test]
    fn indexed_word_load_pops_offset_then_base() {
        let mut memory = Memory::new(64).unwrap();
        memory.write(0x0e, &[0xaa]).unwrap();
        let mut ctx = context(&mut memory);
        ctx.push_value(0x10, 2).unwrap(); // base
        ctx.push_value((-2i16) as u16 as u64, 2).unwrap(); // offset
        execute_load(&mut ctx, 1, AddressingMode::IndexedWord).unwrap();
        assert_eq!(ctx.stack_pointer, 63);
        assert_eq!(ctx.pop_value(1).unwrap(), 0xaa);
    }

    #[test]
    fn indexed_byte_store_pops_value_before_base() {
        let mut memory = Memory::new(64).unwrap();
        let mut ctx = context(&mut memory);
        ctx.push_value(0x20, 2).unwrap(); // base
        ctx.push_value(0xbeef, 2).unwrap(); // value
        execute_store(&mut ctx, 2, AddressingMode::IndexedByte(4)).unwrap();
        assert_eq!(ctx.stack_pointer, 64);
        assert_eq!(ctx.memory.read(0x24, 2).unwrap(), &[0xef, 0xbe]);
    }

    #[test]
    fn store_out_of_bounds_does_not_write() {
        let mut memory = Memory::new(64).unwrap();
        let mut ctx = context(&mut memory);
        ctx.push_value(0x1122_3344, 4).unwrap();
        let err = execute_store(&mut ctx, 4, AddressingMode::Direct(62)).unwrap_err();
        assert_eq!(
            err,
            VmError::BoundsViolation {
                address: 62,
                length: 4
            }
        );
        assert!(ctx.last_store.is_none());
    }
}
