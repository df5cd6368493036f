//! Fault kinds reported by the VM.

use thiserror::Error;

use crate::config::{
    STATUS_BOUNDS_VIOLATION, STATUS_DIVISION_BY_ZERO, STATUS_HOST_ERROR, STATUS_STACK_OVERFLOW,
    STATUS_STACK_UNDERFLOW, STATUS_TRUNCATED_INSTRUCTION, STATUS_UNKNOWN_OPCODE,
};

/// A step that fails leaves the machine state untouched and returns one of these.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VmError {
    #[error("unknown opcode {opcode:#04x} at {address:#06x}")]
    UnknownOpcode { opcode: u8, address: u16 },

    #[error("integer division by zero at {address:#06x}")]
    DivisionByZero { address: u16 },

    #[error("memory access of {length} bytes at {address:#06x} is outside the buffer")]
    BoundsViolation { address: usize, length: usize },

    #[error("instruction at {address:#06x} needs {needed} bytes past the end of memory")]
    TruncatedInstruction { address: u16, needed: usize },

    #[error("stack underflow: popping {requested} bytes at sp {stack_pointer:#06x}")]
    StackUnderflow { stack_pointer: usize, requested: usize },

    #[error("stack overflow: pushing {requested} bytes at sp {stack_pointer:#06x}")]
    StackOverflow { stack_pointer: usize, requested: usize },

    #[error("host stack access width must be 1..=8 bytes, got {width}")]
    InvalidWidth { width: usize },

    #[error("{register} value {value:#x} is out of range")]
    RegisterOutOfRange { register: &'static str, value: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image of {length} bytes does not fit at {base:#06x}")]
    ImageTooLarge { base: usize, length: usize },
}

impl VmError {
    /// Negative status code handed to integer-only hosts.
    #[must_use]
    pub const fn status_code(&self) -> i32 {
        match self {
            Self::UnknownOpcode { .. } => STATUS_UNKNOWN_OPCODE,
            Self::DivisionByZero { .. } => STATUS_DIVISION_BY_ZERO,
            Self::BoundsViolation { .. } => STATUS_BOUNDS_VIOLATION,
            Self::TruncatedInstruction { .. } => STATUS_TRUNCATED_INSTRUCTION,
            Self::StackUnderflow { .. } => STATUS_STACK_UNDERFLOW,
            Self::StackOverflow { .. } => STATUS_STACK_OVERFLOW,
            Self::InvalidWidth { .. }
            | Self::RegisterOutOfRange { .. }
            | Self::InvalidConfig(_)
            | Self::ImageTooLarge { .. } => STATUS_HOST_ERROR,
        }
    }
}
