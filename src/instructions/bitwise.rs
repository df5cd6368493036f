//! Optional bitwise ALU group: AND, OR, XOR and logical NOT.

use crate::decoder::AluOp;

/// Apply a bitwise command. `None` for arithmetic commands.
#[must_use]
pub fn apply(op: AluOp, a: u64, b: u64) -> Option<u64> {
    match op {
        AluOp::And => Some(a & b),
        AluOp::Or => Some(a | b),
        AluOp::Xor => Some(a ^ b),
        // Logical, not bitwise complement: 0 -> 1, anything else -> 0.
        AluOp::Not => Some(u64::from(a == 0)),
        _ => None,
    }
}
