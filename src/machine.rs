//! Machine state and the single-step execution engine.
//!
//! `Machine::step` decodes the instruction at ip, runs it against a working
//! copy of the registers and commits only on success, so a fault leaves the
//! machine exactly as it was before the step.

use crate::config::VmConfig;
use crate::context::InstructionContext;
use crate::decoder::{decode, Instruction};
use crate::error::VmError;
use crate::instructions;
use crate::instructions::base::{bytes_to_value_le, value_to_bytes_le};
use crate::memory::Memory;
use crate::types::{Flags, MemoryAccess, RunOutcome, RunStatus, StepStatus};

/// Host push/pop/peek move whole values of 1..=8 bytes.
fn check_host_width(width: usize) -> Result<(), VmError> {
    if width == 0 || width > 8 {
        return Err(VmError::InvalidWidth { width });
    }
    Ok(())
}

/// One running program: memory, instruction pointer, stack pointer and flags.
#[derive(Clone, Debug)]
pub struct Machine {
    config: VmConfig,
    memory: Memory,
    instruction_pointer: u16,
    stack_pointer: usize,
    stack_base: usize,
    flags: Flags,
    last_opcode: Option<u8>,
    last_load: Option<MemoryAccess>,
    last_store: Option<MemoryAccess>,
}

impl Machine {
    /// Zeroed memory of `memory_size` bytes, ip at 0, empty stack at the top of memory.
    pub fn new(config: VmConfig, memory_size: usize) -> Result<Self, VmError> {
        config.validate()?;
        let memory = Memory::new(memory_size)?;
        Ok(Self {
            config,
            memory,
            instruction_pointer: 0,
            stack_pointer: memory_size,
            stack_base: memory_size,
            flags: Flags::default(),
            last_opcode: None,
            last_load: None,
            last_store: None,
        })
    }

    /// Copy a code/data image into memory at `base`.
    pub fn load(&mut self, base: u16, image: &[u8]) -> Result<(), VmError> {
        self.memory.load_image(usize::from(base), image)
    }

    #[must_use]
    pub const fn config(&self) -> &VmConfig {
        &self.config
    }

    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub const fn instruction_pointer(&self) -> u16 {
        self.instruction_pointer
    }

    pub fn set_instruction_pointer(&mut self, address: u16) {
        self.instruction_pointer = address;
    }

    #[must_use]
    pub const fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    /// Move sp within the current stack; it may not pass the empty-stack mark.
    pub fn set_stack_pointer(&mut self, stack_pointer: usize) -> Result<(), VmError> {
        if stack_pointer > self.stack_base {
            return Err(VmError::StackUnderflow {
                stack_pointer: self.stack_pointer,
                requested: stack_pointer - self.stack_pointer,
            });
        }
        self.stack_pointer = stack_pointer;
        Ok(())
    }

    /// Empty the stack and place its top (exclusive) at `top`.
    pub fn reset_stack(&mut self, top: usize) -> Result<(), VmError> {
        if top > self.memory.len() {
            return Err(VmError::BoundsViolation {
                address: top,
                length: 0,
            });
        }
        self.stack_pointer = top;
        self.stack_base = top;
        Ok(())
    }

    #[must_use]
    pub const fn stack_base(&self) -> usize {
        self.stack_base
    }

    /// Bytes currently on the stack, top first.
    #[must_use]
    pub fn stack(&self) -> &[u8] {
        &self.memory.as_slice()[self.stack_pointer..self.stack_base]
    }

    #[must_use]
    pub const fn stack_depth(&self) -> usize {
        self.stack_base - self.stack_pointer
    }

    /// Top `width` bytes as a zero-extended little-endian value.
    pub fn peek(&self, width: usize) -> Result<u64, VmError> {
        check_host_width(width)?;
        if width > self.stack_depth() {
            return Err(VmError::StackUnderflow {
                stack_pointer: self.stack_pointer,
                requested: width,
            });
        }
        Ok(bytes_to_value_le(self.memory.read(self.stack_pointer, width)?))
    }

    /// Host-side push (arguments for the program).
    pub fn push_value(&mut self, value: u64, width: usize) -> Result<(), VmError> {
        check_host_width(width)?;
        let new_sp = self
            .stack_pointer
            .checked_sub(width)
            .ok_or(VmError::StackOverflow {
                stack_pointer: self.stack_pointer,
                requested: width,
            })?;
        self.memory.write(new_sp, &value_to_bytes_le(value, width))?;
        self.stack_pointer = new_sp;
        Ok(())
    }

    /// Host-side pop (results from the program).
    pub fn pop_value(&mut self, width: usize) -> Result<u64, VmError> {
        let value = self.peek(width)?;
        self.stack_pointer += width;
        Ok(value)
    }

    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Opcode of the last successfully executed instruction.
    #[must_use]
    pub const fn last_opcode(&self) -> Option<u8> {
        self.last_opcode
    }

    /// Data read by the last executed instruction, if it was a memory LOAD.
    #[must_use]
    pub const fn last_load(&self) -> Option<MemoryAccess> {
        self.last_load
    }

    /// Data written by the last executed instruction, if it was a STORE.
    #[must_use]
    pub const fn last_store(&self) -> Option<MemoryAccess> {
        self.last_store
    }

    /// Decode without executing.
    pub fn decode_at(&self, address: u16) -> Result<Instruction, VmError> {
        decode(&self.memory, address, &self.config)
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> Result<StepStatus, VmError> {
        let instruction = self.decode_at(self.instruction_pointer).inspect_err(|err| {
            fault_trace!("decode fault at {:#06x}: {}", self.instruction_pointer, err);
        })?;
        step_trace!(
            "{:#06x} {:#04x} {} sp={:#06x}",
            instruction.address,
            instruction.opcode,
            instruction.operation.name(),
            self.stack_pointer
        );

        let mut context = InstructionContext {
            memory: &mut self.memory,
            instruction_pointer: instruction.next_address(),
            stack_pointer: self.stack_pointer,
            stack_base: self.stack_base,
            flags: self.flags,
            branch_condition: self.config.branch_condition,
            opcode: instruction.opcode,
            instruction_address: instruction.address,
            last_load: None,
            last_store: None,
        };
        let status = instructions::execute(instruction.operation, &mut context).inspect_err(|err| {
            fault_trace!(
                "{} at {:#06x} faulted: {}",
                instruction.operation.name(),
                instruction.address,
                err
            );
        })?;

        let InstructionContext {
            instruction_pointer,
            stack_pointer,
            flags,
            last_load,
            last_store,
            ..
        } = context;
        self.instruction_pointer = instruction_pointer;
        self.stack_pointer = stack_pointer;
        self.flags = flags;
        self.last_opcode = Some(instruction.opcode);
        self.last_load = last_load;
        self.last_store = last_store;
        Ok(status)
    }

    /// Step until HALT or YIELD, or until `max_steps` instructions have run.
    pub fn run(&mut self, max_steps: u64) -> Result<RunOutcome, VmError> {
        let mut steps = 0;
        while steps < max_steps {
            let status = self.step()?;
            steps += 1;
            match status {
                StepStatus::Continue => {}
                StepStatus::Halted => {
                    return Ok(RunOutcome {
                        status: RunStatus::Halted,
                        steps,
                    })
                }
                StepStatus::Yielded => {
                    return Ok(RunOutcome {
                        status: RunStatus::Yielded,
                        steps,
                    })
                }
            }
        }
        Ok(RunOutcome {
            status: RunStatus::BudgetExhausted,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        alu_opcode, memory_opcode, ALU_ADD, ALU_DIV, MODE_DIRECT, MODE_IMMEDIATE, OPCODE_HALT,
        OPCODE_LOAD, OPCODE_STORE, OPCODE_YIELD, WIDTH_16, WIDTH_8,
    };

    fn machine(program: &[u8]) -> Machine {
        let mut machine = Machine::new(VmConfig::default(), 256).unwrap();
        machine.load(0, program).unwrap();
        machine
    }

    #[test]
    fn new_machine_has_empty_stack_at_top() {
        let machine = Machine::new(VmConfig::default(), 1024).unwrap();
        assert_eq!(machine.instruction_pointer(), 0);
        assert_eq!(machine.stack_pointer(), 1024);
        assert_eq!(machine.stack_depth(), 0);
        assert!(Machine::new(VmConfig::default(), 0).is_err());
    }

    #[test]
    fn fault_leaves_state_untouched() {
        let imm8 = memory_opcode(OPCODE_LOAD, MODE_IMMEDIATE, WIDTH_8);
        let mut machine = machine(&[imm8, 5, imm8, 0, alu_opcode(ALU_DIV, WIDTH_8)]);
        machine.step().unwrap();
        machine.step().unwrap();
        let before = machine.clone();
        assert_eq!(machine.step(), Err(VmError::DivisionByZero { address: 4 }));
        assert_eq!(machine.instruction_pointer(), before.instruction_pointer());
        assert_eq!(machine.stack_pointer(), before.stack_pointer());
        assert_eq!(machine.flags(), before.flags());
        assert_eq!(machine.memory().as_slice(), before.memory().as_slice());
    }

    #[test]
    fn unknown_opcode_is_reported_without_advancing() {
        let mut machine = machine(&[0x77]);
        assert_eq!(
            machine.step(),
            Err(VmError::UnknownOpcode {
                opcode: 0x77,
                address: 0
            })
        );
        assert_eq!(machine.instruction_pointer(), 0);
        assert_eq!(machine.last_opcode(), None);
    }

    #[test]
    fn halt_keeps_ip_on_halt() {
        let mut machine = machine(&[OPCODE_HALT]);
        assert_eq!(machine.step(), Ok(StepStatus::Halted));
        assert_eq!(machine.instruction_pointer(), 0);
        assert_eq!(machine.step(), Ok(StepStatus::Halted));
    }

    #[test]
    fn run_stops_on_yield_and_resumes() {
        let imm8 = memory_opcode(OPCODE_LOAD, MODE_IMMEDIATE, WIDTH_8);
        let mut machine = machine(&[imm8, 2, OPCODE_YIELD, imm8, 3, alu_opcode(ALU_ADD, WIDTH_8), OPCODE_HALT]);
        let first = machine.run(100).unwrap();
        assert_eq!(
            first,
            RunOutcome {
                status: RunStatus::Yielded,
                steps: 2
            }
        );
        assert_eq!(machine.instruction_pointer(), 3);
        let second = machine.run(100).unwrap();
        assert_eq!(second.status, RunStatus::Halted);
        assert_eq!(machine.peek(1).unwrap(), 5);
    }

    #[test]
    fn run_respects_budget() {
        let imm8 = memory_opcode(OPCODE_LOAD, MODE_IMMEDIATE, WIDTH_8);
        let mut machine = machine(&[imm8, 1, imm8, 2, OPCODE_HALT]);
        let outcome = machine.run(1).unwrap();
        assert_eq!(outcome.status, RunStatus::BudgetExhausted);
        assert_eq!(outcome.steps, 1);
        assert_eq!(machine.instruction_pointer(), 2);
    }

    #[test]
    fn memory_trace_records_last_access() {
        let program = [
            memory_opcode(OPCODE_LOAD, MODE_IMMEDIATE, WIDTH_16),
            0xcd,
            0xab,
            memory_opcode(OPCODE_STORE, MODE_DIRECT, WIDTH_16),
            0x80,
            0x00,
            memory_opcode(OPCODE_LOAD, MODE_DIRECT, WIDTH_16),
            0x80,
            0x00,
        ];
        let mut machine = machine(&program);
        machine.step().unwrap();
        assert_eq!(machine.last_load(), None);
        machine.step().unwrap();
        assert_eq!(
            machine.last_store(),
            Some(MemoryAccess {
                address: 0x80,
                value: 0xabcd
            })
        );
        machine.step().unwrap();
        assert_eq!(machine.last_store(), None);
        assert_eq!(
            machine.last_load(),
            Some(MemoryAccess {
                address: 0x80,
                value: 0xabcd
            })
        );
    }

    #[test]
    fn host_push_and_pop() {
        let mut machine = Machine::new(VmConfig::default(), 16).unwrap();
        machine.push_value(0x0102_0304, 4).unwrap();
        assert_eq!(machine.stack(), &[4, 3, 2, 1]);
        assert_eq!(machine.pop_value(4).unwrap(), 0x0102_0304);
        assert!(machine.pop_value(1).is_err());
        assert!(machine.push_value(0, 17).is_err());
    }

    #[test]
    fn host_widths_outside_one_to_eight_are_rejected() {
        let mut machine = Machine::new(VmConfig::default(), 16).unwrap();
        machine.push_value(0xaa, 1).unwrap();
        assert_eq!(
            machine.push_value(0x55, 0),
            Err(VmError::InvalidWidth { width: 0 })
        );
        assert_eq!(machine.stack(), &[0xaa]);
        assert_eq!(machine.stack_pointer(), 15);

        machine.pop_value(1).unwrap();
        machine.push_value(0xbbbb, 2).unwrap();
        machine.pop_value(2).unwrap();
        assert_eq!(
            machine.push_value(0, 10),
            Err(VmError::InvalidWidth { width: 10 })
        );
        assert_eq!(machine.stack_depth(), 0);
        assert!(machine.peek(9).is_err());
        assert!(machine.pop_value(0).is_err());
    }

    #[test]
    fn reset_stack_moves_empty_mark() {
        let mut machine = Machine::new(VmConfig::default(), 64).unwrap();
        machine.reset_stack(32).unwrap();
        assert_eq!(machine.stack_pointer(), 32);
        assert_eq!(machine.stack_base(), 32);
        assert!(machine.reset_stack(65).is_err());
        assert!(machine.set_stack_pointer(33).is_err());
    }
}
