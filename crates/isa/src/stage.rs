//! Indices into an instruction's stage-exit timestamp array.

/// One of the five timestamp slots an instruction records as it retires.
///
/// The three execute sub-stages (EX1, EX2, EX3) share a single timestamp
/// slot: only EX3 (the last of the three) records one, since the pipeline
/// treats the three-cycle execute phase as a single logical `EX` stage for
/// output purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Instruction fetch.
    If,
    /// Instruction decode / operand read / hazard check.
    Id,
    /// Execute (the timestamp recorded by EX3).
    Ex,
    /// Memory access.
    Mem,
    /// Write-back.
    Wb,
}

impl Stage {
    /// The index of this stage within a timestamp array.
    pub const fn index(self) -> usize {
        match self {
            Self::If => 0,
            Self::Id => 1,
            Self::Ex => 2,
            Self::Mem => 3,
            Self::Wb => 4,
        }
    }
}
