//! Opcode decoder: classifies the byte at the instruction pointer, resolves the
//! operand width and reads any inline operand bytes.
//!
//! Decoding never mutates machine state. An instruction whose operands run past
//! the end of memory is reported as `TruncatedInstruction`.

use crate::config::{
    VmConfig, ALU_ADD, ALU_AND, ALU_DIV, ALU_FADD, ALU_FDIV, ALU_FMUL, ALU_FSUB, ALU_MOD,
    ALU_MUL, ALU_NOT, ALU_OR, ALU_SUB, ALU_XOR, COND_ALWAYS, COND_EQ, COND_GE, COND_GT, COND_LE,
    COND_LT, COND_NE, DEPTH_FROM_OPERAND, MODE_DIRECT, MODE_IMMEDIATE, MODE_INDEXED_BYTE,
    MODE_INDEXED_WORD, OPCODE_ALU, OPCODE_ALU_LAST, OPCODE_BRANCH, OPCODE_BRANCH_LAST,
    OPCODE_CALL, OPCODE_CALL_INDIRECT, OPCODE_CONVF, OPCODE_CONVI, OPCODE_DIG, OPCODE_DIG_LAST,
    OPCODE_DUP, OPCODE_DUP_LAST, OPCODE_FLOAT, OPCODE_FLOAT_LAST, OPCODE_HALT, OPCODE_LOAD,
    OPCODE_LOAD_LAST, OPCODE_POP, OPCODE_POP_LAST, OPCODE_RET, OPCODE_STORE, OPCODE_STORE_LAST,
    OPCODE_YIELD,
};
use crate::error::VmError;
use crate::instructions::base::bytes_to_value_le;
use crate::memory::Memory;

/// Where a LOAD reads from / a STORE writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    /// Inline 16-bit absolute address.
    Direct(u16),
    /// Base popped from the stack plus an inline unsigned byte.
    IndexedByte(u8),
    /// Signed offset then base, both popped from the stack.
    IndexedWord,
    /// LOAD only: the value itself follows the opcode.
    Immediate(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    /// Logical not; the only unary ALU command.
    Not,
}

impl AluOp {
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::Not)
    }

    #[must_use]
    pub const fn is_bitwise(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor | Self::Not)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Branch condition code (opcode bits 1-3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Equal,
    NotEqual,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    /// Code 7: decoded and consumed, never taken.
    Never,
}

impl Condition {
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code & 0x07 {
            COND_ALWAYS => Self::Always,
            COND_EQ => Self::Equal,
            COND_NE => Self::NotEqual,
            COND_LT => Self::Less,
            COND_GE => Self::GreaterOrEqual,
            COND_LE => Self::LessOrEqual,
            COND_GT => Self::Greater,
            _ => Self::Never,
        }
    }

    /// Evaluate against a zero/negative pair (flags, or a popped value compared with 0).
    #[must_use]
    pub const fn holds(self, zero: bool, negative: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Equal => zero,
            Self::NotEqual => !zero,
            Self::Less => negative,
            Self::GreaterOrEqual => !negative,
            Self::LessOrEqual => negative || zero,
            Self::Greater => !negative && !zero,
            Self::Never => false,
        }
    }
}

/// Decoded instruction kind with its extracted fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Load { width: usize, mode: AddressingMode },
    Store { width: usize, mode: AddressingMode },
    Pop { width: usize },
    Dup { width: usize, depth: u8 },
    Dig { width: usize, depth: u8 },
    Call { target: u16 },
    CallIndirect,
    Return,
    Arithmetic { width: usize, op: AluOp },
    Float(FloatOp),
    ConvertToInt,
    ConvertToFloat,
    Branch { condition: Condition, displacement: i16 },
    Yield,
    Halt,
}

impl Operation {
    /// Mnemonic used in trace and fault logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Load { mode, .. } => match mode {
                AddressingMode::Immediate(_) => "LOAD_IMM",
                _ => "LOAD",
            },
            Self::Store { .. } => "STORE",
            Self::Pop { .. } => "POP",
            Self::Dup { .. } => "DUP",
            Self::Dig { .. } => "DIG",
            Self::Call { .. } => "CALL",
            Self::CallIndirect => "CALL_IND",
            Self::Return => "RET",
            Self::Arithmetic { op, .. } => match op {
                AluOp::Add => "ADD",
                AluOp::Sub => "SUB",
                AluOp::Mul => "MUL",
                AluOp::Div => "DIV",
                AluOp::Mod => "MOD",
                AluOp::And => "AND",
                AluOp::Or => "OR",
                AluOp::Xor => "XOR",
                AluOp::Not => "NOT",
            },
            Self::Float(op) => match op {
                FloatOp::Add => "FADD",
                FloatOp::Sub => "FSUB",
                FloatOp::Mul => "FMUL",
                FloatOp::Div => "FDIV",
            },
            Self::ConvertToInt => "CONVI",
            Self::ConvertToFloat => "CONVF",
            Self::Branch { .. } => "BRANCH",
            Self::Yield => "YIELD",
            Self::Halt => "HALT",
        }
    }
}

/// One decoded instruction: opcode byte, its address, total encoded length and operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub address: u16,
    /// Opcode plus inline operand bytes.
    pub length: u16,
    pub operation: Operation,
}

impl Instruction {
    /// Address of the next sequential instruction.
    #[must_use]
    pub const fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.length)
    }
}

/// Reads inline operand bytes after the opcode, reporting truncation against the whole instruction.
struct OperandReader<'a> {
    memory: &'a Memory,
    address: u16,
    consumed: usize,
}

impl<'a> OperandReader<'a> {
    fn new(memory: &'a Memory, address: u16) -> Self {
        Self {
            memory,
            address,
            consumed: 1,
        }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], VmError> {
        let start = usize::from(self.address) + self.consumed;
        let bytes = self
            .memory
            .read(start, count)
            .map_err(|_| VmError::TruncatedInstruction {
                address: self.address,
                needed: self.consumed + count,
            })?;
        self.consumed += count;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, VmError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, VmError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn length(&self) -> u16 {
        self.consumed as u16
    }
}

/// Decode the instruction at `address` under `config`.
pub fn decode(memory: &Memory, address: u16, config: &VmConfig) -> Result<Instruction, VmError> {
    let opcode = memory.read_u8(usize::from(address))?;
    let unknown = VmError::UnknownOpcode { opcode, address };
    let width = config.operand_width.resolve(opcode);
    let mode_field = (opcode >> 2) & 0x03;
    let mut reader = OperandReader::new(memory, address);

    let operation = match opcode {
        OPCODE_LOAD..=OPCODE_LOAD_LAST => {
            let mode = match mode_field {
                MODE_DIRECT => AddressingMode::Direct(reader.u16()?),
                MODE_INDEXED_BYTE if config.indexed_byte_addressing => {
                    AddressingMode::IndexedByte(reader.u8()?)
                }
                MODE_INDEXED_WORD => AddressingMode::IndexedWord,
                MODE_IMMEDIATE if !config.indexed_byte_addressing => {
                    AddressingMode::Immediate(bytes_to_value_le(reader.take(width)?))
                }
                _ => return Err(unknown),
            };
            Operation::Load { width, mode }
        }
        OPCODE_STORE..=OPCODE_STORE_LAST => {
            let mode = match mode_field {
                MODE_DIRECT => AddressingMode::Direct(reader.u16()?),
                MODE_INDEXED_BYTE if config.indexed_byte_addressing => {
                    AddressingMode::IndexedByte(reader.u8()?)
                }
                MODE_INDEXED_WORD => AddressingMode::IndexedWord,
                _ => return Err(unknown),
            };
            Operation::Store { width, mode }
        }
        OPCODE_POP..=OPCODE_POP_LAST => Operation::Pop { width },
        OPCODE_DUP..=OPCODE_DUP_LAST => Operation::Dup {
            width,
            depth: depth(mode_field, &mut reader)?,
        },
        OPCODE_DIG..=OPCODE_DIG_LAST => Operation::Dig {
            width,
            depth: depth(mode_field, &mut reader)?,
        },
        OPCODE_CALL => Operation::Call {
            target: reader.u16()?,
        },
        OPCODE_CALL_INDIRECT => Operation::CallIndirect,
        OPCODE_RET => Operation::Return,
        OPCODE_ALU..=OPCODE_ALU_LAST => {
            let op = match command_field(opcode) {
                ALU_ADD => AluOp::Add,
                ALU_SUB => AluOp::Sub,
                ALU_MUL => AluOp::Mul,
                ALU_DIV => AluOp::Div,
                ALU_MOD => AluOp::Mod,
                ALU_AND => AluOp::And,
                ALU_OR => AluOp::Or,
                ALU_XOR => AluOp::Xor,
                ALU_NOT => AluOp::Not,
                _ => return Err(unknown),
            };
            if op.is_bitwise() && !config.bitwise {
                return Err(unknown);
            }
            Operation::Arithmetic { width, op }
        }
        OPCODE_FLOAT..=OPCODE_FLOAT_LAST if config.floating_point => {
            let op = match command_field(opcode) {
                ALU_FADD => FloatOp::Add,
                ALU_FSUB => FloatOp::Sub,
                ALU_FMUL => FloatOp::Mul,
                ALU_FDIV => FloatOp::Div,
                _ => return Err(unknown),
            };
            Operation::Float(op)
        }
        OPCODE_CONVI if config.floating_point => Operation::ConvertToInt,
        OPCODE_CONVF if config.floating_point => Operation::ConvertToFloat,
        OPCODE_BRANCH..=OPCODE_BRANCH_LAST => {
            let condition = Condition::from_code(opcode >> 1);
            let displacement = if opcode & 0x01 == 0 {
                i16::from(reader.u8()? as i8)
            } else {
                reader.u16()? as i16
            };
            Operation::Branch {
                condition,
                displacement,
            }
        }
        OPCODE_YIELD => Operation::Yield,
        OPCODE_HALT => Operation::Halt,
        _ => return Err(unknown),
    };

    Ok(Instruction {
        opcode,
        address,
        length: reader.length(),
        operation,
    })
}

/// ALU/FPU command field (opcode bits 2-5).
const fn command_field(opcode: u8) -> u8 {
    (opcode & 0x3c) >> 2
}

/// DUP/DIG depth: inline 0..=2, or the next operand byte when the field is 3.
fn depth(field: u8, reader: &mut OperandReader<'_>) -> Result<u8, VmError> {
    if field == DEPTH_FROM_OPERAND {
        reader.u8()
    } else {
        Ok(field)
    }
}
