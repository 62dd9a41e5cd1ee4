//! Errors for the `sixstage-isa` crate.

use thiserror::Error;

/// An error that occurs while constructing an [Instruction].
///
/// [Instruction]: crate::Instruction
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IsaError {
    /// An immediate operand did not fit in a signed 16-bit field.
    #[error("immediate {0} does not fit in a signed 16-bit field (-32768..=32767)")]
    ImmediateOutOfRange(i32),
    /// A memory-access effective address was not word-aligned.
    #[error("unaligned effective address {0:#x} (low two bits must be zero)")]
    UnalignedAddress(u32),
}
