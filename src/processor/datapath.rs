//! The DataPath: register file, ALU, memory array, I/O buffers, and flag
//! latches. Ticking is owned by [`super::control::ControlUnit`]; the
//! DataPath only performs signals.

use std::collections::VecDeque;

use crate::error::VmError;
use crate::isa::Opcode;
use crate::memory::{DataMemory, Storage};

/// Floored division (Python `//` semantics): rounds toward negative
/// infinity rather than toward zero.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Floored modulus: the remainder carries the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

pub struct DataPath {
    memory: DataMemory,
    acc: i32,
    address_reg: i32,
    memory_output: i32,
    alu_output: i32,
    flag_zero: bool,
    flag_negative: bool,
    input_buffer: VecDeque<i32>,
    output_buffer: String,
}

impl DataPath {
    /// `input` is consumed as a stream of Unicode codepoints; newlines are
    /// translated to codepoint 0, matching the source language's input
    /// terminator convention, and a trailing 0 is always appended so that an
    /// unterminated stream still yields a terminator rather than
    /// `InputExhausted`.
    pub fn new(memory: DataMemory, input: &str) -> Self {
        let mut input_buffer: VecDeque<i32> = input
            .chars()
            .map(|c| if c == '\n' { 0 } else { c as i32 })
            .collect();
        input_buffer.push_back(0);
        Self {
            memory,
            acc: 0,
            address_reg: 0,
            memory_output: 0,
            alu_output: 0,
            flag_zero: true,
            flag_negative: false,
            input_buffer,
            output_buffer: String::new(),
        }
    }

    pub fn acc(&self) -> i32 {
        self.acc
    }

    pub fn flag_zero(&self) -> bool {
        self.flag_zero
    }

    pub fn flag_negative(&self) -> bool {
        self.flag_negative
    }

    pub fn memory_output(&self) -> i32 {
        self.memory_output
    }

    pub fn output(&self) -> &str {
        &self.output_buffer
    }

    fn set_flags(&mut self, result: i32) {
        self.alu_output = result;
        self.flag_zero = result == 0;
        self.flag_negative = result < 0;
    }

    /// Latch `address_reg` from an explicit value (an instruction's `arg`, or
    /// a previously-resolved indirect target).
    pub fn latch_address(&mut self, value: i32) -> Result<(), VmError> {
        self.memory.check_range(value)?;
        self.address_reg = value;
        Ok(())
    }

    pub fn read_memory(&mut self) -> Result<(), VmError> {
        self.memory_output = self.memory.read(self.address_reg)?;
        Ok(())
    }

    pub fn write_memory(&mut self, value: i32) -> Result<(), VmError> {
        self.memory.write(self.address_reg, value)
    }

    /// Route a value through the ALU unchanged, updating flags from it. Used
    /// by `LD` (operand) and `IN` (freshly-latched acc).
    pub fn pass_through(&mut self, value: i32) -> i32 {
        self.set_flags(value);
        value
    }

    pub fn latch_acc_from_alu(&mut self) {
        self.acc = self.alu_output;
    }

    pub fn latch_acc_from_input(&mut self) -> Result<(), VmError> {
        let codepoint = self.input_buffer.pop_front().ok_or(VmError::InputExhausted)?;
        self.acc = codepoint;
        Ok(())
    }

    /// `ADD`/`SUB`/`MUL`/`DIV`/`MOD`/`CMP`: `acc OP right`, bounds-checked to
    /// i32. `CMP` behaves like `SUB` but the caller does not latch `acc` from
    /// the result.
    pub fn alu_binary(&mut self, op: Opcode, right: i32) -> Result<(), VmError> {
        let left = i64::from(self.acc);
        let right = i64::from(right);
        let result = match op {
            Opcode::Add => left + right,
            Opcode::Sub | Opcode::Cmp => left - right,
            Opcode::Mul => left * right,
            Opcode::Div => {
                if right == 0 {
                    return Err(VmError::DivisionByZero);
                }
                floor_div(left, right)
            }
            Opcode::Mod => {
                if right == 0 {
                    return Err(VmError::DivisionByZero);
                }
                floor_mod(left, right)
            }
            _ => unreachable!("alu_binary called with a non-ALU opcode"),
        };
        let result = i32::try_from(result).map_err(|_| VmError::IntegerOverflow)?;
        self.set_flags(result);
        Ok(())
    }

    pub fn output_char(&mut self) {
        let ch = char::from_u32(self.acc as u32).unwrap_or('\u{FFFD}');
        self.output_buffer.push(ch);
    }

    pub fn output_number(&mut self) {
        self.output_buffer.push_str(&self.acc.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_div_rounds_toward_negative_infinity() {
        assert_eq!(floor_div(-7, 3), -3);
        assert_eq!(floor_div(7, 3), 2);
        assert_eq!(floor_div(-7, -3), 2);
    }

    #[test]
    fn floor_mod_carries_divisor_sign() {
        assert_eq!(floor_mod(-7, 3), 2);
        assert_eq!(floor_mod(7, -3), -2);
        assert_eq!(floor_mod(7, 3), 1);
    }

    #[test]
    fn input_exhaustion_is_reported() {
        let mut dp = DataPath::new(DataMemory::new(4), "");
        dp.latch_acc_from_input().unwrap();
        assert_eq!(dp.acc(), 0);
        assert_eq!(dp.latch_acc_from_input(), Err(VmError::InputExhausted));
    }
}
