//! File loading: reads the instruction and data files from disk and runs
//! them through the assembler, attaching path context to any failure.

use std::fs;
use std::path::Path;

use crate::assembler::{self, Program};
use crate::errors::EmuError;

/// Reads and assembles the instruction file at `path`.
pub fn read_program(path: &Path) -> Result<Program, EmuError> {
    let text = fs::read_to_string(path).map_err(|source| EmuError::ReadFile { path: path.to_owned(), source })?;
    assembler::assemble_program(&text).map_err(|source| EmuError::Assemble { path: path.to_owned(), source })
}

/// Reads and parses the data file at `path` into signed words.
pub fn read_data(path: &Path) -> Result<Vec<i32>, EmuError> {
    let text = fs::read_to_string(path).map_err(|source| EmuError::ReadFile { path: path.to_owned(), source })?;
    assembler::assemble_data(&text).map_err(|source| EmuError::Assemble { path: path.to_owned(), source })
}
