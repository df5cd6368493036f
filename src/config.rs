//! VM configuration: opcode table constants, flag bits, status codes and the
//! runtime `VmConfig` record that selects the instruction-set variant.

use crate::error::VmError;

// ============================================================================
// Memory Configuration
// ============================================================================
/// Addresses are 16-bit, so a machine never sees more than 64KB.
pub const MAX_MEMORY_SIZE: usize = 65_536;
/// Width of a return address / base address / indexed-word offset on the stack.
pub const ADDRESS_SIZE: usize = 2;
/// Float operands and CONVI/CONVF always move 4 bytes.
pub const FLOAT_SIZE: usize = 4;
/// Stack-compare branches pop a 32-bit value.
pub const BRANCH_VALUE_SIZE: usize = 4;

// ============================================================================
// Flag bits
// ============================================================================
pub const FLAG_ZERO: u8 = 0x01;
pub const FLAG_NEGATIVE: u8 = 0x02;

// ============================================================================
// Step status codes (host contract)
// ============================================================================
pub const STATUS_CONTINUE: i32 = 0;
pub const STATUS_HALT: i32 = -1;
pub const STATUS_YIELD: i32 = -2;
pub const STATUS_UNKNOWN_OPCODE: i32 = -3;
pub const STATUS_DIVISION_BY_ZERO: i32 = -4;
pub const STATUS_BOUNDS_VIOLATION: i32 = -5;
pub const STATUS_TRUNCATED_INSTRUCTION: i32 = -6;
pub const STATUS_STACK_UNDERFLOW: i32 = -7;
pub const STATUS_STACK_OVERFLOW: i32 = -8;
pub const STATUS_HOST_ERROR: i32 = -9;

// ============================================================================
// Opcode families (base byte of each range)
// ============================================================================
pub const OPCODE_LOAD: u8 = 0x00;
pub const OPCODE_LOAD_LAST: u8 = 0x0f;
pub const OPCODE_STORE: u8 = 0x10;
// Runs to 0x1b so indexed-word stores exist at every width, not only 1 and 2.
pub const OPCODE_STORE_LAST: u8 = 0x1b;
pub const OPCODE_POP: u8 = 0x1c;
pub const OPCODE_POP_LAST: u8 = 0x1f;
pub const OPCODE_DUP: u8 = 0x20;
pub const OPCODE_DUP_LAST: u8 = 0x2f;
pub const OPCODE_DIG: u8 = 0x30;
pub const OPCODE_DIG_LAST: u8 = 0x3f;
pub const OPCODE_CALL: u8 = 0x40;
pub const OPCODE_CALL_INDIRECT: u8 = 0x41;
pub const OPCODE_RET: u8 = 0x42;
pub const OPCODE_ALU: u8 = 0x80;
pub const OPCODE_ALU_LAST: u8 = 0xab;
pub const OPCODE_FLOAT: u8 = 0xac;
// Runs to 0xbb: float commands share the ALU field layout, so FMUL (13) and
// FDIV (14) land past 0xb0.
pub const OPCODE_FLOAT_LAST: u8 = 0xbb;
pub const OPCODE_CONVI: u8 = 0xbc;
pub const OPCODE_CONVF: u8 = 0xbd;
pub const OPCODE_BRANCH: u8 = 0xc0;
pub const OPCODE_BRANCH_LAST: u8 = 0xd0;
pub const OPCODE_YIELD: u8 = 0xfe;
pub const OPCODE_HALT: u8 = 0xff;

// Sub-field selectors (bits 2-3 of LOAD/STORE opcodes).
pub const MODE_DIRECT: u8 = 0;
pub const MODE_INDEXED_BYTE: u8 = 1;
pub const MODE_INDEXED_WORD: u8 = 2;
pub const MODE_IMMEDIATE: u8 = 3;

// Width selectors (bits 0-1).
pub const WIDTH_8: u8 = 0;
pub const WIDTH_16: u8 = 1;
pub const WIDTH_32: u8 = 2;
pub const WIDTH_64: u8 = 3;

// ALU command field (bits 2-5).
pub const ALU_ADD: u8 = 0;
pub const ALU_SUB: u8 = 1;
pub const ALU_MUL: u8 = 2;
pub const ALU_DIV: u8 = 3;
pub const ALU_MOD: u8 = 4;
pub const ALU_AND: u8 = 5;
pub const ALU_OR: u8 = 6;
pub const ALU_XOR: u8 = 7;
pub const ALU_NOT: u8 = 8;
pub const ALU_FADD: u8 = 11;
pub const ALU_FSUB: u8 = 12;
pub const ALU_FMUL: u8 = 13;
pub const ALU_FDIV: u8 = 14;

/// DUP/DIG depth field value meaning "depth follows as an operand byte".
pub const DEPTH_FROM_OPERAND: u8 = 3;

// Branch condition codes (bits 1-3 of BRANCH opcodes).
pub const COND_ALWAYS: u8 = 0;
pub const COND_EQ: u8 = 1;
pub const COND_NE: u8 = 2;
pub const COND_LT: u8 = 3;
pub const COND_GE: u8 = 4;
pub const COND_LE: u8 = 5;
pub const COND_GT: u8 = 6;
pub const COND_NEVER: u8 = 7;

/// Opcode for LOAD/STORE with the given addressing mode and width selector.
#[must_use]
pub const fn memory_opcode(base: u8, mode: u8, width_selector: u8) -> u8 {
    base | (mode << 2) | (width_selector & 0x03)
}

/// Opcode for an ALU command at the given width selector.
#[must_use]
pub const fn alu_opcode(command: u8, width_selector: u8) -> u8 {
    OPCODE_ALU | (command << 2) | (width_selector & 0x03)
}

/// Opcode for DUP/DIG with an inline depth field (0..=3) and width selector.
#[must_use]
pub const fn stack_opcode(base: u8, depth_field: u8, width_selector: u8) -> u8 {
    base | ((depth_field & 0x03) << 2) | (width_selector & 0x03)
}

/// Opcode for a branch with the given condition code; `long` selects the 16-bit displacement.
#[must_use]
pub const fn branch_opcode(condition: u8, long: bool) -> u8 {
    OPCODE_BRANCH | ((condition & 0x07) << 1) | (long as u8)
}

// ============================================================================
// Runtime instruction-set selection
// ============================================================================

/// How the operand width of data instructions is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperandWidth {
    /// `width = 1 << (opcode & 0x03)`.
    #[default]
    PerInstruction,
    /// One global width in bytes (1, 2 or 4); the per-opcode width bits are ignored.
    Fixed(u8),
}

impl OperandWidth {
    /// Parse a host-facing bit count (8, 16 or 32) into a fixed width.
    pub fn from_bits(bits: u32) -> Result<Self, VmError> {
        match bits {
            8 => Ok(Self::Fixed(1)),
            16 => Ok(Self::Fixed(2)),
            32 => Ok(Self::Fixed(4)),
            other => Err(VmError::InvalidConfig(format!(
                "fixed operand width must be 8, 16 or 32 bits, got {other}"
            ))),
        }
    }

    /// Width in bytes for `opcode`.
    #[must_use]
    pub const fn resolve(self, opcode: u8) -> usize {
        match self {
            Self::PerInstruction => 1 << (opcode & 0x03),
            Self::Fixed(bytes) => bytes as usize,
        }
    }
}

/// Where conditional branches take their condition from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BranchCondition {
    /// Zero/Negative flags left by the last ALU/FPU result. Nothing is popped.
    #[default]
    Flags,
    /// Pop a signed 32-bit value and compare it against zero.
    StackValue,
}

/// Instruction-set variant of one machine. Fixed for the machine's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VmConfig {
    pub operand_width: OperandWidth,
    /// Indexed-byte LOAD/STORE. Takes the encoding slot of LOAD-immediate.
    pub indexed_byte_addressing: bool,
    pub bitwise: bool,
    pub floating_point: bool,
    pub branch_condition: BranchCondition,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            operand_width: OperandWidth::PerInstruction,
            indexed_byte_addressing: false,
            bitwise: true,
            floating_point: true,
            branch_condition: BranchCondition::Flags,
        }
    }
}

impl VmConfig {
    #[must_use]
    pub const fn with_operand_width(mut self, operand_width: OperandWidth) -> Self {
        self.operand_width = operand_width;
        self
    }

    #[must_use]
    pub const fn with_indexed_byte_addressing(mut self, enabled: bool) -> Self {
        self.indexed_byte_addressing = enabled;
        self
    }

    #[must_use]
    pub const fn with_bitwise(mut self, enabled: bool) -> Self {
        self.bitwise = enabled;
        self
    }

    #[must_use]
    pub const fn with_floating_point(mut self, enabled: bool) -> Self {
        self.floating_point = enabled;
        self
    }

    #[must_use]
    pub const fn with_branch_condition(mut self, branch_condition: BranchCondition) -> Self {
        self.branch_condition = branch_condition;
        self
    }

    /// Reject configurations no opcode table can express.
    pub fn validate(&self) -> Result<(), VmError> {
        if let OperandWidth::Fixed(bytes) = self.operand_width {
            if !matches!(bytes, 1 | 2 | 4) {
                return Err(VmError::InvalidConfig(format!(
                    "fixed operand width must be 1, 2 or 4 bytes, got {bytes}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_instruction_width_follows_low_bits() {
        let w = OperandWidth::PerInstruction;
        assert_eq!(w.resolve(0x00), 1);
        assert_eq!(w.resolve(0x01), 2);
        assert_eq!(w.resolve(0x02), 4);
        assert_eq!(w.resolve(0x03), 8);
    }

    #[test]
    fn fixed_width_ignores_opcode_bits() {
        let w = OperandWidth::from_bits(16).unwrap();
        assert_eq!(w.resolve(0x00), 2);
        assert_eq!(w.resolve(0x03), 2);
        assert!(OperandWidth::from_bits(64).is_err());
    }

    #[test]
    fn validate_rejects_odd_fixed_width() {
        let config = VmConfig::default().with_operand_width(OperandWidth::Fixed(3));
        assert!(matches!(config.validate(), Err(VmError::InvalidConfig(_))));
        assert!(VmConfig::default().validate().is_ok());
    }

    #[test]
    fn opcode_builders_match_table() {
        assert_eq!(memory_opcode(OPCODE_LOAD, MODE_DIRECT, WIDTH_16), 0x01);
        assert_eq!(memory_opcode(OPCODE_STORE, MODE_INDEXED_WORD, WIDTH_64), 0x1b);
        assert_eq!(alu_opcode(ALU_ADD, WIDTH_8), 0x80);
        assert_eq!(alu_opcode(ALU_MOD, WIDTH_32), 0x92);
        assert_eq!(branch_opcode(COND_ALWAYS, false), 0xc0);
        assert_eq!(branch_opcode(COND_GT, true), 0xcd);
        assert_eq!(stack_opcode(OPCODE_DIG, DEPTH_FROM_OPERAND, WIDTH_8), 0x3c);
    }
}
