//! Opcodes, addressing modes, the instruction record, and the binary codec.
//!
//! This module is the single source of truth for the wire format: both the
//! translator (encode side) and the VM (decode side) depend on it.

use byteorder::{BigEndian, ByteOrder};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use thiserror::Error;

use crate::constants::{INSTRUCTION_BYTES, MODE_BITS, MODE_MASK, SENTINEL, WORD_BYTES};

/// The machine's big-endian wire order, named the way `byteorder` users
/// usually name their endian alias.
pub type Endian = BigEndian;

/// Opcode tags. Numeric values are part of the binary contract and must not
/// change.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    Hlt = 1,
    Ld = 4,
    St = 5,
    Add = 6,
    Sub = 7,
    Mul = 8,
    Div = 9,
    Mod = 10,
    Cmp = 13,
    Jmp = 14,
    Je = 15,
    Jne = 16,
    Jl = 17,
    Jg = 18,
    In = 19,
    Out = 20,
    Outn = 21,
}

impl Opcode {
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jmp | Opcode::Je | Opcode::Jne | Opcode::Jl | Opcode::Jg
        )
    }

    pub fn is_alu(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod | Opcode::Cmp
        )
    }

    fn tag(self) -> u8 {
        self.to_u8().expect("opcode tags fit in a byte")
    }

    fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Cmp => "CMP",
            Opcode::Jmp => "JMP",
            Opcode::Je => "JE",
            Opcode::Jne => "JNE",
            Opcode::Jl => "JL",
            Opcode::Jg => "JG",
            Opcode::In => "IN",
            Opcode::Out => "OUT",
            Opcode::Outn => "OUTN",
        }
    }
}

/// How an instruction's `arg` is interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, FromPrimitive, ToPrimitive)]
pub enum AddressingMode {
    Direct = 0,
    Indirect = 1,
    Immediate = 2,
}

impl AddressingMode {
    fn tag(self) -> u8 {
        self.to_u8().expect("mode tags fit in two bits")
    }

    fn mnemonic_prefix(self) -> &'static str {
        match self {
            AddressingMode::Direct => "",
            AddressingMode::Indirect => "~",
            AddressingMode::Immediate => "#",
        }
    }
}

/// A single decoded instruction: opcode, signed 32-bit argument, addressing
/// mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg: i32,
    pub mode: AddressingMode,
}

impl Instruction {
    pub fn new(opcode: Opcode, arg: i32, mode: AddressingMode) -> Self {
        Self { opcode, arg, mode }
    }

    pub fn direct(opcode: Opcode, arg: i32) -> Self {
        Self::new(opcode, arg, AddressingMode::Direct)
    }

    pub fn indirect(opcode: Opcode, arg: i32) -> Self {
        Self::new(opcode, arg, AddressingMode::Indirect)
    }

    pub fn immediate(opcode: Opcode, arg: i32) -> Self {
        Self::new(opcode, arg, AddressingMode::Immediate)
    }

    /// A jump, I/O, or HLT instruction: mode is ignored at execution time but
    /// still round-trips through the codec, so we pick `Direct` as the
    /// canonical value we emit.
    pub fn bare(opcode: Opcode, arg: i32) -> Self {
        Self::new(opcode, arg, AddressingMode::Direct)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode {
            Opcode::Hlt => write!(f, "{}", self.opcode.mnemonic()),
            op if op.is_alu() || matches!(op, Opcode::Ld | Opcode::St) => write!(
                f,
                "{} {}{}",
                self.opcode.mnemonic(),
                self.mode.mnemonic_prefix(),
                self.arg
            ),
            _ => write!(f, "{} {}", self.opcode.mnemonic(), self.arg),
        }
    }
}

/// Errors decoding a byte stream produced by [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("bytecode ends mid-instruction-frame")]
    TruncatedFrame,
    #[error("bytecode ends mid-data-word")]
    TruncatedWord,
    #[error("unknown opcode tag {0}")]
    UnknownOpcode(u8),
    #[error("unknown addressing mode {0}")]
    UnknownMode(u8),
}

/// Encode a program and its initial data image into the wire format: one
/// 5-byte frame per instruction, a 5-byte all-zero sentinel, then one 4-byte
/// big-endian word per memory cell.
pub fn encode(instructions: &[Instruction], data_memory: &[i32]) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(INSTRUCTION_BYTES * (instructions.len() + 1) + WORD_BYTES * data_memory.len());
    for instr in instructions {
        bytes.push((instr.opcode.tag() << MODE_BITS) | instr.mode.tag());
        let mut arg = [0u8; WORD_BYTES];
        Endian::write_i32(&mut arg, instr.arg);
        bytes.extend_from_slice(&arg);
    }
    bytes.extend_from_slice(&SENTINEL);
    for &word in data_memory {
        let mut buf = [0u8; WORD_BYTES];
        Endian::write_i32(&mut buf, word);
        bytes.extend_from_slice(&buf);
    }
    bytes
}

/// Decode a byte stream produced by [`encode`] back into instructions and a
/// data image.
pub fn decode(bytes: &[u8]) -> Result<(Vec<Instruction>, Vec<i32>), BytecodeError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    loop {
        let frame = bytes
            .get(offset..offset + INSTRUCTION_BYTES)
            .ok_or(BytecodeError::TruncatedFrame)?;
        offset += INSTRUCTION_BYTES;
        if frame == SENTINEL {
            break;
        }
        let tag = frame[0] >> MODE_BITS;
        let mode_tag = frame[0] & MODE_MASK;
        let opcode = Opcode::from_u8(tag).ok_or(BytecodeError::UnknownOpcode(tag))?;
        let mode = AddressingMode::from_u8(mode_tag).ok_or(BytecodeError::UnknownMode(mode_tag))?;
        let arg = Endian::read_i32(&frame[1..INSTRUCTION_BYTES]);
        instructions.push(Instruction::new(opcode, arg, mode));
    }

    let mut data_memory = Vec::new();
    while offset < bytes.len() {
        let word = bytes
            .get(offset..offset + WORD_BYTES)
            .ok_or(BytecodeError::TruncatedWord)?;
        data_memory.push(Endian::read_i32(word));
        offset += WORD_BYTES;
    }
    Ok((instructions, data_memory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_empty_program() {
        let (instructions, data) = decode(&encode(&[], &[])).unwrap();
        assert!(instructions.is_empty());
        assert!(data.is_empty());
    }

    #[test]
    fn round_trip_mixed_program() {
        let program = vec![
            Instruction::immediate(Opcode::Ld, -7),
            Instruction::direct(Opcode::St, 12),
            Instruction::indirect(Opcode::Ld, 3),
            Instruction::bare(Opcode::Jmp, 0),
            Instruction::bare(Opcode::Hlt, 0),
        ];
        let data = vec![i32::MIN, 0, i32::MAX, 42];
        let bytes = encode(&program, &data);
        let (decoded_instrs, decoded_data) = decode(&bytes).unwrap();
        assert_eq!(decoded_instrs, program);
        assert_eq!(decoded_data, data);
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let bytes = vec![0u8; 3];
        assert_eq!(decode(&bytes), Err(BytecodeError::TruncatedFrame));
    }

    #[test]
    fn decode_rejects_truncated_word() {
        let mut bytes = encode(&[], &[]);
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(decode(&bytes), Err(BytecodeError::TruncatedWord));
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        // A non-zero, non-existent tag: an all-zero frame is indistinguishable
        // from the sentinel and would be read as end-of-instructions instead.
        let mut bytes = vec![(99u8 << MODE_BITS) | 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&SENTINEL);
        assert_eq!(decode(&bytes), Err(BytecodeError::UnknownOpcode(99)));
    }

    #[test]
    fn decode_rejects_unknown_mode() {
        let tag = Opcode::Ld.tag();
        let mut bytes = vec![(tag << MODE_BITS) | 0b11, 0, 0, 0, 0];
        bytes.extend_from_slice(&SENTINEL);
        assert_eq!(decode(&bytes), Err(BytecodeError::UnknownMode(0b11)));
    }

    #[test]
    fn display_matches_disassembly_style() {
        assert_eq!(Instruction::bare(Opcode::Hlt, 0).to_string(), "HLT");
        assert_eq!(Instruction::direct(Opcode::Ld, 5).to_string(), "LD 5");
        assert_eq!(Instruction::indirect(Opcode::Ld, 5).to_string(), "LD ~5");
        assert_eq!(Instruction::immediate(Opcode::Ld, 5).to_string(), "LD #5");
    }
}
