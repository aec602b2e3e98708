//! `avm` — the accumulator-machine ISA, binary codec, data memory, and
//! cycle-accurate VM. See the `avmc` crate for the translator that targets
//! this ISA.

pub mod constants;
pub mod error;
pub mod isa;
pub mod memory;
pub mod processor;
pub mod simulator;

pub use error::VmError;
pub use isa::{decode, encode, AddressingMode, BytecodeError, Instruction, Opcode};
pub use memory::{DataMemory, Storage};
pub use processor::{ControlUnit, DataPath, StepOutcome};
pub use simulator::{simulate, ExitReason, RunConfig, RunOutcome};
