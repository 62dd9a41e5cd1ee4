//! Errors for the `sixstage-hw` crate.

use thiserror::Error;

/// An error that occurs while advancing the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A memory-access effective address was not word-aligned. Fatal,
    /// raised during EX1 of `lw`/`sw`.
    #[error("unaligned effective address {0:#x} (low two bits must be zero)")]
    UnalignedAddress(u32),
    /// Execution reached a data word or an empty slot where an instruction
    /// was expected — most often caused by a program missing its trailing
    /// `hlt`.
    #[error("attempted to execute a non-instruction word at address {0:#x}; forget to add HLT?")]
    MissingHalt(u32),
    /// An effective address fell outside the simulated RAM.
    #[error("address {0:#x} is out of bounds for {1}-word main memory")]
    AddressOutOfBounds(u32, usize),
}

/// A [`Result`] type with [`Result::Err`] = [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;
