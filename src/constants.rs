//! Layout and limit constants shared by the ISA codec, the translator, and
//! the VM.

/// Bytes used to encode a single instruction frame: one tag byte, four
/// argument bytes.
pub const INSTRUCTION_BYTES: usize = 5;

/// Bytes used to encode a single data-memory word.
pub const WORD_BYTES: usize = 4;

/// The end-of-code sentinel: an all-zero instruction frame.
pub const SENTINEL: [u8; INSTRUCTION_BYTES] = [0; INSTRUCTION_BYTES];

/// Number of bits reserved for the addressing mode in the tag byte.
pub const MODE_BITS: u8 = 2;

/// Mask isolating the addressing-mode bits of the tag byte.
pub const MODE_MASK: u8 = 0b11;

/// Default data-memory capacity, in words, when the caller does not specify
/// one.
pub const DEFAULT_MEMORY_CAPACITY: usize = 1000;

/// Default soft cap on executed instructions before a run is aborted.
pub const DEFAULT_INSTRUCTION_LIMIT: u64 = 60_000;

/// Maximum codepoints a string literal or `str` variable may hold.
pub const MAX_STRING_LENGTH: usize = 63;

/// Words reserved per `str` variable: one length word plus `MAX_STRING_LENGTH`
/// character words.
pub const STRING_SLAB_WORDS: usize = MAX_STRING_LENGTH + 1;
