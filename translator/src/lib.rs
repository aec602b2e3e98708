//! Translates the accumulator-machine source language (§4.2, §4.3) into the
//! instruction/data-memory pair that [`avm::isa::encode`] turns into
//! bytecode.

mod error;
mod expr;
mod statement;
mod translator;

use avm::isa::Instruction;

pub use error::TranslationError;
pub use expr::{parse_postfix, ExprToken};
pub use translator::Translator;

/// Translate a whole source program in one shot, the common case.
pub fn translate(source: &str) -> Result<(Vec<Instruction>, Vec<i32>), TranslationError> {
    Translator::new().translate(source)
}
