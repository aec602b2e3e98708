//! Runtime fault taxonomy for the VM. Translation-time errors live in the
//! `avmc` crate; bytecode-decoding errors live alongside the codec in
//! [`crate::isa`].

use thiserror::Error;

/// A fault raised while the [`crate::processor::ControlUnit`] is executing a
/// decoded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("address {0} is out of range")]
    AddressOutOfRange(i32),
    #[error("ALU result overflowed a 32-bit signed integer")]
    IntegerOverflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("input buffer exhausted")]
    InputExhausted,
}
