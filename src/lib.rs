//! Pico VM: a compact stack-based bytecode interpreter for embedding.
//!
//! A `Machine` owns a flat byte memory of at most 64 KiB holding code, data and
//! a downward-growing stack. The host loads an image, then drives execution one
//! instruction at a time with `Machine::step` (or `Machine::run` with a step
//! budget). Instruction-set variants are chosen per machine through `VmConfig`.
//! Node hosts use the `PicoMachine` class exported with the `napi` feature.

/// Per-instruction trace at `trace` level. No-op unless built with `--features step_tracing`.
#[macro_export]
macro_rules! step_trace {
    ($($t:tt)*) => {
        #[cfg(feature = "step_tracing")]
        ::log::trace!($($t)*);
    };
}

/// Fault paths only, at `debug` level. Enabled by `fault_tracing` or `step_tracing`.
#[macro_export]
macro_rules! fault_trace {
    ($($t:tt)*) => {
        #[cfg(any(feature = "fault_tracing", feature = "step_tracing"))]
        ::log::debug!($($t)*);
    };
}

pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod instructions;
pub mod machine;
pub mod memory;
pub mod types;

#[cfg(feature = "napi")]
mod bindings;

pub use config::{BranchCondition, OperandWidth, VmConfig, MAX_MEMORY_SIZE};
pub use decoder::{decode, AddressingMode, AluOp, Condition, FloatOp, Instruction, Operation};
pub use error::VmError;
pub use machine::Machine;
pub use memory::Memory;
pub use types::{
    host_address, run_status_code, status_code, Flags, MemoryAccess, RunOutcome, RunStatus,
    StepStatus,
};
