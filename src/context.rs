//! Per-step execution context and the stack engine.
//!
//! A step runs against working copies of ip/sp/flags. Handlers read freely but
//! write memory at most once, as their last action; the machine commits the
//! registers only when the handler returns `Ok`.

use crate::config::BranchCondition;
use crate::error::VmError;
use crate::instructions::base::bytes_to_value_le;
use crate::memory::Memory;
use crate::types::{Flags, MemoryAccess};

/// Instruction execution context handed to every handler.
pub struct InstructionContext<'a> {
    pub memory: &'a mut Memory,
    /// Already advanced past the current instruction.
    pub instruction_pointer: u16,
    pub stack_pointer: usize,
    /// Empty-stack mark; the stack occupies `[stack_pointer, stack_base)`.
    pub stack_base: usize,
    pub flags: Flags,
    pub branch_condition: BranchCondition,
    /// Opcode and address of the instruction being executed (for fault reports).
    pub opcode: u8,
    pub instruction_address: u16,
    pub last_load: Option<MemoryAccess>,
    pub last_store: Option<MemoryAccess>,
}

impl InstructionContext<'_> {
    /// Bytes `[sp + offset, sp + offset + length)`; underflow if that reaches past the stack base.
    pub fn peek_bytes(&self, offset: usize, length: usize) -> Result<&[u8], VmError> {
        let start = self.stack_pointer + offset;
        if start + length > self.stack_base {
            return Err(VmError::StackUnderflow {
                stack_pointer: self.stack_pointer,
                requested: offset + length,
            });
        }
        self.memory.read(start, length)
    }

    /// Pop `width` bytes and return them zero-extended, little-endian.
    pub fn pop_value(&mut self, width: usize) -> Result<u64, VmError> {
        let value = bytes_to_value_le(self.peek_bytes(0, width)?);
        self.stack_pointer += width;
        Ok(value)
    }

    pub fn pop_u16(&mut self) -> Result<u16, VmError> {
        Ok(self.pop_value(2)? as u16)
    }

    /// Make room for `length` bytes; returns the new stack pointer. Writes nothing.
    pub fn reserve(&mut self, length: usize) -> Result<usize, VmError> {
        let new_sp = self
            .stack_pointer
            .checked_sub(length)
            .ok_or(VmError::StackOverflow {
                stack_pointer: self.stack_pointer,
                requested: length,
            })?;
        self.stack_pointer = new_sp;
        Ok(new_sp)
    }

    /// Push raw bytes (already little-endian). This is a memory write: call it last.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), VmError> {
        let address = self.reserve(bytes.len())?;
        self.memory.write(address, bytes)
    }

    /// Push the low `width` bytes of `value`.
    pub fn push_value(&mut self, value: u64, width: usize) -> Result<(), VmError> {
        let bytes = value.to_le_bytes();
        if width <= bytes.len() {
            self.push_bytes(&bytes[..width])
        } else {
            let mut wide = vec![0u8; width];
            wide[..bytes.len()].copy_from_slice(&bytes);
            self.push_bytes(&wide)
        }
    }
}

#[cfg(test)]
impl<'a> InstructionContext<'a> {
    /// Empty stack at the top of `memory`, flags clear, ip at 0.
    pub(crate) fn for_tests(memory: &'a mut Memory) -> Self {
        let base = memory.len();
        Self {
            memory,
            instruction_pointer: 0,
            stack_pointer: base,
            stack_base: base,
            flags: Flags::default(),
            branch_condition: BranchCondition::Flags,
            opcode: 0,
            instruction_address: 0,
            last_load: None,
            last_store: None,
        }
    }
}
