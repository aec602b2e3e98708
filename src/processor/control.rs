//! ControlUnit: decodes instructions, drives DataPath signals, advances the
//! instruction pointer, and counts ticks.

use crate::error::VmError;
use crate::isa::{AddressingMode, Instruction, Opcode};

use super::datapath::DataPath;

/// The outcome of a single [`ControlUnit::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halted,
    InputExhausted,
    Fault(VmError),
}

pub struct ControlUnit {
    instructions: Vec<Instruction>,
    instr_pointer: usize,
    tick_counter: u64,
    data_path: DataPath,
}

impl ControlUnit {
    pub fn new(instructions: Vec<Instruction>, data_path: DataPath) -> Self {
        Self {
            instructions,
            instr_pointer: 0,
            tick_counter: 0,
            data_path,
        }
    }

    pub fn instr_pointer(&self) -> usize {
        self.instr_pointer
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    pub fn data_path(&self) -> &DataPath {
        &self.data_path
    }

    fn tick(&mut self) {
        self.tick_counter += 1;
    }

    /// Resolve an operand for LD/ALU per addressing mode, ticking once per
    /// memory read along the way.
    fn resolve_operand(&mut self, instr: Instruction) -> Result<i32, VmError> {
        match instr.mode {
            AddressingMode::Immediate => Ok(instr.arg),
            AddressingMode::Direct => {
                self.data_path.latch_address(instr.arg)?;
                self.data_path.read_memory()?;
                self.tick();
                Ok(self.data_path.memory_output())
            }
            AddressingMode::Indirect => {
                self.data_path.latch_address(instr.arg)?;
                self.data_path.read_memory()?;
                self.tick();
                self.data_path.latch_address(self.data_path.memory_output())?;
                self.data_path.read_memory()?;
                self.tick();
                Ok(self.data_path.memory_output())
            }
        }
    }

    fn execute_ld(&mut self, instr: Instruction) -> Result<(), VmError> {
        let value = self.resolve_operand(instr)?;
        self.data_path.pass_through(value);
        self.data_path.latch_acc_from_alu();
        Ok(())
    }

    fn execute_st(&mut self, instr: Instruction) -> Result<(), VmError> {
        let target = match instr.mode {
            AddressingMode::Direct | AddressingMode::Immediate => instr.arg,
            AddressingMode::Indirect => {
                self.data_path.latch_address(instr.arg)?;
                self.data_path.read_memory()?;
                self.tick();
                self.data_path.memory_output()
            }
        };
        self.data_path.latch_address(target)?;
        if instr.mode == AddressingMode::Indirect {
            self.tick();
        }
        let value = self.data_path.pass_through(self.data_path.acc());
        self.data_path.write_memory(value)?;
        Ok(())
    }

    fn execute_alu(&mut self, instr: Instruction) -> Result<(), VmError> {
        let right = self.resolve_operand(instr)?;
        self.data_path.alu_binary(instr.opcode, right)?;
        if instr.opcode != Opcode::Cmp {
            self.data_path.latch_acc_from_alu();
        }
        Ok(())
    }

    fn execute_in(&mut self) -> Result<(), VmError> {
        self.data_path.latch_acc_from_input()?;
        self.data_path.pass_through(self.data_path.acc());
        Ok(())
    }

    fn jump_taken(&self, opcode: Opcode) -> bool {
        match opcode {
            Opcode::Jmp => true,
            Opcode::Je => self.data_path.flag_zero(),
            Opcode::Jne => !self.data_path.flag_zero(),
            Opcode::Jl => self.data_path.flag_negative(),
            Opcode::Jg => !self.data_path.flag_negative() && !self.data_path.flag_zero(),
            _ => unreachable!("jump_taken called with a non-jump opcode"),
        }
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> StepOutcome {
        let Some(&instr) = self.instructions.get(self.instr_pointer) else {
            return StepOutcome::Fault(VmError::AddressOutOfRange(self.instr_pointer as i32));
        };

        if instr.opcode == Opcode::Hlt {
            return StepOutcome::Halted;
        }

        if instr.opcode.is_jump() {
            self.instr_pointer = if self.jump_taken(instr.opcode) {
                instr.arg as usize
            } else {
                self.instr_pointer + 1
            };
            self.tick();
            return StepOutcome::Continue;
        }

        let result = match instr.opcode {
            Opcode::Ld => self.execute_ld(instr),
            Opcode::St => self.execute_st(instr),
            op if op.is_alu() => self.execute_alu(instr),
            Opcode::In => self.execute_in(),
            Opcode::Out => {
                self.data_path.output_char();
                Ok(())
            }
            Opcode::Outn => {
                self.data_path.output_number();
                Ok(())
            }
            Opcode::Hlt | Opcode::Jmp | Opcode::Je | Opcode::Jne | Opcode::Jl | Opcode::Jg => {
                unreachable!("handled above")
            }
        };

        match result {
            Ok(()) => {
                self.tick();
                self.instr_pointer += 1;
                StepOutcome::Continue
            }
            Err(VmError::InputExhausted) => StepOutcome::InputExhausted,
            Err(err) => StepOutcome::Fault(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DataMemory;

    fn run(instructions: Vec<Instruction>, memory: &[i32], input: &str) -> (ControlUnit, StepOutcome) {
        let data_path = DataPath::new(DataMemory::with_image(memory, 64), input);
        let mut cu = ControlUnit::new(instructions, data_path);
        loop {
            match cu.step() {
                StepOutcome::Continue => continue,
                outcome => return (cu, outcome),
            }
        }
    }

    #[test]
    fn hlt_terminates_with_zero_extra_ticks() {
        let (cu, outcome) = run(vec![Instruction::bare(Opcode::Hlt, 0)], &[], "");
        assert_eq!(outcome, StepOutcome::Halted);
        assert_eq!(cu.tick_counter(), 0);
    }

    #[test]
    fn immediate_load_and_output_number() {
        let (cu, outcome) = run(
            vec![
                Instruction::immediate(Opcode::Ld, 42),
                Instruction::bare(Opcode::Outn, 0),
                Instruction::bare(Opcode::Hlt, 0),
            ],
            &[],
            "",
        );
        assert_eq!(outcome, StepOutcome::Halted);
        assert_eq!(cu.data_path().output(), "42");
        // LD immediate: 1 tick. OUTN: 1 tick. Total 2.
        assert_eq!(cu.tick_counter(), 2);
    }

    #[test]
    fn direct_store_then_indirect_load() {
        let (cu, outcome) = run(
            vec![
                Instruction::immediate(Opcode::Ld, 7),
                Instruction::direct(Opcode::St, 0), // memory[0] = 7
                Instruction::immediate(Opcode::Ld, 1),
                Instruction::direct(Opcode::St, 1), // memory[1] = 1 (a pointer to memory[1]? no: points nowhere useful)
                Instruction::indirect(Opcode::Ld, 1), // memory[memory[1]] = memory[1] = 1
                Instruction::bare(Opcode::Outn, 0),
                Instruction::bare(Opcode::Hlt, 0),
            ],
            &[0, 0],
            "",
        );
        assert_eq!(outcome, StepOutcome::Halted);
        assert_eq!(cu.data_path().output(), "1");
    }

    #[test]
    fn floored_division_and_modulo() {
        let (cu, _) = run(
            vec![
                Instruction::immediate(Opcode::Ld, -7),
                Instruction::immediate(Opcode::Mod, 3),
                Instruction::bare(Opcode::Outn, 0),
                Instruction::bare(Opcode::Hlt, 0),
            ],
            &[],
            "",
        );
        assert_eq!(cu.data_path().output(), "2");
    }

    #[test]
    fn division_by_zero_is_a_fault() {
        let (_, outcome) = run(
            vec![
                Instruction::immediate(Opcode::Ld, 1),
                Instruction::immediate(Opcode::Div, 0),
            ],
            &[],
            "",
        );
        assert_eq!(outcome, StepOutcome::Fault(VmError::DivisionByZero));
    }

    #[test]
    fn overflow_is_a_fault() {
        let (_, outcome) = run(
            vec![
                Instruction::immediate(Opcode::Ld, i32::MAX),
                Instruction::immediate(Opcode::Add, 1),
            ],
            &[],
            "",
        );
        assert_eq!(outcome, StepOutcome::Fault(VmError::IntegerOverflow));
    }

    #[test]
    fn jg_is_neither_negative_nor_zero() {
        let program = vec![
            Instruction::immediate(Opcode::Ld, 5),
            Instruction::immediate(Opcode::Cmp, 5), // acc - 5 == 0
            Instruction::bare(Opcode::Jg, 5),       // not taken
            Instruction::immediate(Opcode::Ld, 0),
            Instruction::bare(Opcode::Jmp, 6),
            Instruction::immediate(Opcode::Ld, 1),
            Instruction::bare(Opcode::Outn, 0),
            Instruction::bare(Opcode::Hlt, 0),
        ];
        let (cu, _) = run(program, &[], "");
        assert_eq!(cu.data_path().output(), "0");
    }

    #[test]
    fn address_out_of_range_is_a_fault() {
        let (_, outcome) = run(vec![Instruction::direct(Opcode::Ld, 1000)], &[], "");
        assert_eq!(outcome, StepOutcome::Fault(VmError::AddressOutOfRange(1000)));
    }

    #[test]
    fn in_reports_exhaustion_after_terminator() {
        let (_, outcome) = run(
            vec![
                Instruction::bare(Opcode::In, 0),
                Instruction::bare(Opcode::In, 0),
            ],
            &[],
            "",
        );
        assert_eq!(outcome, StepOutcome::InputExhausted);
    }
}
