//! Errors for the `sixstage-emu` crate.

use std::path::PathBuf;

use thiserror::Error;

/// An error encountered while assembling an instruction or data file.
///
/// Assembler syntax and label errors are fatal before the engine starts;
/// this carries enough context for the caller to print a useful message
/// to stderr.
#[derive(Error, Debug)]
pub enum AssembleError {
    /// A line did not match any opcode family's syntax.
    #[error("instruction {index}: unrecognized syntax: {text:?}")]
    UnrecognizedSyntax {
        /// 0-based instruction index of the offending line.
        index: usize,
        /// The raw line text.
        text: String,
    },
    /// A branch or jump referenced a label with no matching definition.
    #[error("instruction {index}: undefined label {label:?}")]
    UndefinedLabel {
        /// 0-based instruction index of the offending line.
        index: usize,
        /// The undefined label.
        label: String,
    },
    /// A data-file token did not parse as a signed 32-bit integer.
    #[error("data file: malformed word {text:?}")]
    MalformedData {
        /// The offending token.
        text: String,
    },
    /// The assembled program exceeds the 256-word limit.
    #[error("program has {0} instructions, exceeding the 256-word limit")]
    ProgramTooLong(usize),
    /// The data segment exceeds the RAM budget available to it.
    #[error("data segment has {0} words, exceeding the {1}-word budget past the data segment base")]
    DataTooLong(usize, usize),
    /// An instruction failed construction-time validation (immediate out of
    /// signed 16-bit range).
    #[error(transparent)]
    Isa(#[from] sixstage_isa::IsaError),
}

/// Top-level error for the `sixstage-emu` driver and CLI.
#[derive(Error, Debug)]
pub enum EmuError {
    /// Failed to read an input file.
    #[error("reading {path:?}: {source}")]
    ReadFile {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Failed to create or write the output file.
    #[error("writing {path:?}: {source}")]
    WriteFile {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Assembling an input file failed.
    #[error("assembling {path:?}: {source}")]
    Assemble {
        /// The file being assembled.
        path: PathBuf,
        /// The underlying assembler error.
        #[source]
        source: AssembleError,
    },
    /// The pipeline raised a fatal runtime error (unaligned access, or a
    /// non-instruction word fetched where an instruction was expected).
    #[error(transparent)]
    Pipeline(#[from] sixstage_hw::PipelineError),
}
