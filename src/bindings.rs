//! NAPI bindings: one `PicoMachine` object per program.
//!
//! Status codes follow `status_code` / `run_status_code`: 0 continue,
//! -1 halt, -2 yield, negative fault codes below that.

use napi::bindgen_prelude::{BigInt, Buffer};
use napi::{Error, Result};
use napi_derive::napi;

use crate::config::{BranchCondition, OperandWidth, VmConfig};
use crate::error::VmError;
use crate::machine::Machine;
use crate::types::{host_address, run_status_code, Flags};

fn to_napi(err: VmError) -> Error {
    Error::from_reason(err.to_string())
}

/// Instruction-set options. Omitted fields keep the `VmConfig` defaults.
#[napi(object)]
pub struct MachineOptions {
    /// 8, 16 or 32 for a global operand width; omit for per-instruction widths.
    pub operand_width_bits: Option<u32>,
    pub indexed_byte_addressing: Option<bool>,
    pub bitwise: Option<bool>,
    pub floating_point: Option<bool>,
    /// Branch on a popped 32-bit value instead of the flags register.
    pub stack_branching: Option<bool>,
}

impl MachineOptions {
    fn into_config(self) -> std::result::Result<VmConfig, VmError> {
        let defaults = VmConfig::default();
        let operand_width = match self.operand_width_bits {
            Some(bits) => OperandWidth::from_bits(bits)?,
            None => defaults.operand_width,
        };
        let branch_condition = if self.stack_branching.unwrap_or(false) {
            BranchCondition::StackValue
        } else {
            BranchCondition::Flags
        };
        Ok(defaults
            .with_operand_width(operand_width)
            .with_indexed_byte_addressing(
                self.indexed_byte_addressing
                    .unwrap_or(defaults.indexed_byte_addressing),
            )
            .with_bitwise(self.bitwise.unwrap_or(defaults.bitwise))
            .with_floating_point(self.floating_point.unwrap_or(defaults.floating_point))
            .with_branch_condition(branch_condition))
    }
}

/// Result of `run`: final status code and instructions executed.
#[napi(object)]
pub struct RunResult {
    pub status: i32,
    pub steps: i64,
}

#[napi]
pub struct PicoMachine {
    machine: Machine,
    last_error: Option<String>,
}

#[napi]
impl PicoMachine {
    #[napi(constructor)]
    pub fn new(memory_size: u32, options: Option<MachineOptions>) -> Result<Self> {
        let config = match options {
            Some(options) => options.into_config().map_err(to_napi)?,
            None => VmConfig::default(),
        };
        let machine = Machine::new(config, memory_size as usize).map_err(to_napi)?;
        Ok(Self {
            machine,
            last_error: None,
        })
    }

    #[napi]
    pub fn load(&mut self, base: u32, image: Buffer) -> Result<()> {
        let base = host_address("load base", base).map_err(to_napi)?;
        self.machine.load(base, image.as_ref()).map_err(to_napi)
    }

    /// Execute one instruction and return its status code.
    #[napi]
    pub fn step(&mut self) -> i32 {
        match self.machine.step() {
            Ok(status) => {
                self.last_error = None;
                status.code()
            }
            Err(err) => {
                let code = err.status_code();
                self.last_error = Some(err.to_string());
                code
            }
        }
    }

    /// Step until halt, yield, a fault, or `max_steps` instructions.
    /// A fault reports its status code with `steps` 0; see `lastError`.
    #[napi]
    pub fn run(&mut self, max_steps: u32) -> RunResult {
        let result = self.machine.run(u64::from(max_steps));
        let status = run_status_code(&result);
        match result {
            Ok(outcome) => {
                self.last_error = None;
                RunResult {
                    status,
                    steps: outcome.steps as i64,
                }
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                RunResult { status, steps: 0 }
            }
        }
    }

    #[napi(getter)]
    pub fn ip(&self) -> u32 {
        u32::from(self.machine.instruction_pointer())
    }

    #[napi(setter, js_name = "ip")]
    pub fn set_ip(&mut self, value: u32) -> Result<()> {
        let address = host_address("ip", value).map_err(to_napi)?;
        self.machine.set_instruction_pointer(address);
        Ok(())
    }

    #[napi(getter)]
    pub fn sp(&self) -> u32 {
        self.machine.stack_pointer() as u32
    }

    #[napi(setter, js_name = "sp")]
    pub fn set_sp(&mut self, value: u32) -> Result<()> {
        self.machine
            .set_stack_pointer(value as usize)
            .map_err(to_napi)
    }

    /// Empty the stack and put its top at `top`.
    #[napi]
    pub fn reset_stack(&mut self, top: u32) -> Result<()> {
        self.machine.reset_stack(top as usize).map_err(to_napi)
    }

    #[napi(getter)]
    pub fn flags(&self) -> u32 {
        u32::from(self.machine.flags().bits())
    }

    #[napi(setter, js_name = "flags")]
    pub fn set_flags(&mut self, value: u32) -> Result<()> {
        let flags = Flags::try_from(value).map_err(to_napi)?;
        self.machine.set_flags(flags);
        Ok(())
    }

    #[napi]
    pub fn read_memory(&self, address: u32, length: u32) -> Result<Buffer> {
        let bytes = self
            .machine
            .memory()
            .read(address as usize, length as usize)
            .map_err(to_napi)?;
        Ok(bytes.to_vec().into())
    }

    #[napi]
    pub fn peek(&self, width: u32) -> Result<BigInt> {
        let value = self.machine.peek(width as usize).map_err(to_napi)?;
        Ok(BigInt::from(value))
    }

    #[napi]
    pub fn push_value(&mut self, value: BigInt, width: u32) -> Result<()> {
        let (_, value, _) = value.get_u64();
        self.machine
            .push_value(value, width as usize)
            .map_err(to_napi)
    }

    #[napi]
    pub fn pop_value(&mut self, width: u32) -> Result<BigInt> {
        let value = self.machine.pop_value(width as usize).map_err(to_napi)?;
        Ok(BigInt::from(value))
    }

    /// Message of the fault raised by the last `step` or `run`, if any.
    #[napi(getter)]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    #[napi(getter)]
    pub fn last_opcode(&self) -> Option<u32> {
        self.machine.last_opcode().map(u32::from)
    }
}
