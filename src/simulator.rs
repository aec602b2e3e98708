//! The simulator loop: drives a [`ControlUnit`] to completion or to one of
//! its non-fatal stopping conditions.

use crate::constants::{DEFAULT_INSTRUCTION_LIMIT, DEFAULT_MEMORY_CAPACITY};
use crate::error::VmError;
use crate::isa::Instruction;
use crate::memory::DataMemory;
use crate::processor::{ControlUnit, DataPath, StepOutcome};

/// Why a run stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Halted,
    InputExhausted,
    LimitReached,
    Fault(VmError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub output: String,
    pub instructions_executed: u64,
    pub ticks: u64,
    pub reason: ExitReason,
}

/// Options controlling a single simulation run.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub memory_capacity: usize,
    pub instr_limit: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            instr_limit: DEFAULT_INSTRUCTION_LIMIT,
        }
    }
}

/// Run `instructions` against `data_image`, feeding `input` to `IN`
/// instructions, until halt, input exhaustion, a fault, or `config.instr_limit`
/// is reached. Always returns a [`RunOutcome`], never panics on a guest
/// fault.
pub fn simulate(
    instructions: Vec<Instruction>,
    data_image: &[i32],
    input: &str,
    config: RunConfig,
) -> RunOutcome {
    let memory = DataMemory::with_image(data_image, config.memory_capacity);
    let data_path = DataPath::new(memory, input);
    let mut control_unit = ControlUnit::new(instructions, data_path);

    let mut executed: u64 = 0;
    let reason = loop {
        if executed >= config.instr_limit {
            log::warn!("instruction limit exceeded");
            break ExitReason::LimitReached;
        }
        match control_unit.step() {
            StepOutcome::Continue => {
                executed += 1;
                log::trace!(
                    "tick {:>5} ip {:>5} acc {:>11}",
                    control_unit.tick_counter(),
                    control_unit.instr_pointer(),
                    control_unit.data_path().acc()
                );
            }
            StepOutcome::Halted => break ExitReason::Halted,
            StepOutcome::InputExhausted => {
                log::warn!("input buffer is empty");
                break ExitReason::InputExhausted;
            }
            StepOutcome::Fault(err) => {
                log::error!("VM fault: {err}");
                break ExitReason::Fault(err);
            }
        }
    };

    let ticks = control_unit.tick_counter();
    log::info!("output_buffer: {:?}", control_unit.data_path().output());
    RunOutcome {
        output: control_unit.data_path().output().to_string(),
        instructions_executed: executed,
        ticks,
        reason,
    }
}
