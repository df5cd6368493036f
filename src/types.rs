//! VM type definitions shared by the decoder, the handlers and the host API.

use crate::config::{FLAG_NEGATIVE, FLAG_ZERO, STATUS_CONTINUE, STATUS_HALT, STATUS_YIELD};
use crate::error::VmError;

// ============================================================================
// Step result
// ============================================================================

/// Outcome of one successful step.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// More instructions pending.
    Continue = STATUS_CONTINUE,
    /// Terminal; do not step this machine again.
    Halted = STATUS_HALT,
    /// Suspended; ip already points past the YIELD, step again to resume.
    Yielded = STATUS_YIELD,
}

impl StepStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Collapse a step result into the integer contract (0 / -1 / -2 / fault code).
#[must_use]
pub fn status_code(result: &Result<StepStatus, VmError>) -> i32 {
    match result {
        Ok(status) => status.code(),
        Err(err) => err.status_code(),
    }
}

// ============================================================================
// Run result (budgeted execution)
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Halted,
    Yielded,
    /// The step budget ran out with the program still runnable.
    BudgetExhausted,
}

impl RunStatus {
    /// Same integer contract as `StepStatus`; an exhausted budget reads as "continue".
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Halted => STATUS_HALT,
            Self::Yielded => STATUS_YIELD,
            Self::BudgetExhausted => STATUS_CONTINUE,
        }
    }
}

/// Collapse a run result into the same integer contract as `status_code`.
#[must_use]
pub fn run_status_code(result: &Result<RunOutcome, VmError>) -> i32 {
    match result {
        Ok(outcome) => outcome.status.code(),
        Err(err) => err.status_code(),
    }
}

/// Result of `Machine::run`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Instructions executed, including the one that halted or yielded.
    pub steps: u64,
}

// ============================================================================
// Flags register
// ============================================================================

/// Zero/Negative condition bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (FLAG_ZERO | FLAG_NEGATIVE))
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn from_conditions(zero: bool, negative: bool) -> Self {
        let mut bits = 0;
        if zero {
            bits |= FLAG_ZERO;
        }
        if negative {
            bits |= FLAG_NEGATIVE;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn zero(self) -> bool {
        self.0 & FLAG_ZERO != 0
    }

    #[must_use]
    pub const fn negative(self) -> bool {
        self.0 & FLAG_NEGATIVE != 0
    }
}

impl TryFrom<u32> for Flags {
    type Error = VmError;

    /// Host-supplied flags; only the Zero and Negative bits may be set.
    fn try_from(value: u32) -> Result<Self, VmError> {
        match u8::try_from(value) {
            Ok(bits) if bits & !(FLAG_ZERO | FLAG_NEGATIVE) == 0 => Ok(Self(bits)),
            _ => Err(VmError::RegisterOutOfRange {
                register: "flags",
                value,
            }),
        }
    }
}

/// Host-supplied 16-bit address (ip, load base).
pub fn host_address(register: &'static str, value: u32) -> Result<u16, VmError> {
    u16::try_from(value).map_err(|_| VmError::RegisterOutOfRange { register, value })
}

// ============================================================================
// Memory access trace
// ============================================================================

/// Address and little-endian value of a data load or store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryAccess {
    pub address: u16,
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_host_contract() {
        assert_eq!(StepStatus::Continue.code(), 0);
        assert_eq!(StepStatus::Halted.code(), -1);
        assert_eq!(StepStatus::Yielded.code(), -2);
        let fault: Result<StepStatus, VmError> = Err(VmError::DivisionByZero { address: 4 });
        assert_eq!(status_code(&fault), -4);
    }

    #[test]
    fn run_status_codes_match_host_contract() {
        let halted = Ok(RunOutcome {
            status: RunStatus::Halted,
            steps: 3,
        });
        let exhausted = Ok(RunOutcome {
            status: RunStatus::BudgetExhausted,
            steps: 10,
        });
        let fault = Err(VmError::StackUnderflow {
            stack_pointer: 8,
            requested: 2,
        });
        assert_eq!(run_status_code(&halted), -1);
        assert_eq!(run_status_code(&exhausted), 0);
        assert_eq!(run_status_code(&fault), -7);
    }

    #[test]
    fn host_values_outside_register_range_are_rejected() {
        assert_eq!(host_address("ip", 0xffff), Ok(0xffff));
        assert_eq!(
            host_address("ip", 0x1_0000),
            Err(VmError::RegisterOutOfRange {
                register: "ip",
                value: 0x1_0000
            })
        );
        assert_eq!(Flags::try_from(0x03), Ok(Flags::from_bits(0x03)));
        assert!(Flags::try_from(0x04).is_err());
        assert!(Flags::try_from(0x101).is_err());
    }

    #[test]
    fn flags_masks_unknown_bits() {
        let flags = Flags::from_bits(0xff);
        assert!(flags.zero());
        assert!(flags.negative());
        assert_eq!(flags.bits(), 0x03);
        assert_eq!(Flags::from_conditions(false, true).bits(), 0x02);
    }
}
