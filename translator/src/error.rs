//! Translation-time error taxonomy.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("unrecognized statement: {0}")]
    UnrecognizedStatement(String),
    #[error("cannot find variable: {0}")]
    UnknownVariable(String),
    #[error("Cannot find variable {0}")]
    UndeclaredVariable(String),
    #[error("{0} cannot be used as a variable name")]
    ReservedName(String),
    #[error("string literal exceeds 63 characters: '{0}'")]
    StringTooLong(String),
    #[error("cannot /in variable {0}, must have str type")]
    InputTypeMismatch(String),
    #[error("unclosed blocks")]
    UnclosedBlocks,
    #[error("unexpected ;")]
    SpuriousBlockClose,
    #[error("integer constant out of range: {0}")]
    IntegerOutOfRange(i64),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
}
