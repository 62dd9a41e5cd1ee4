//! The closed set of opcode kinds the pipeline understands.

/// An opcode kind.
///
/// This is the closed set described by the simulator's instruction set:
/// three R-type arithmetic/logic ops, their I-type immediate counterparts,
/// the two memory ops, `li`, the two branches, `j`, and the three pipeline
/// control markers (`hlt`, `nop`, `stop`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `add rd, rs, rt`
    Add,
    /// `sub rd, rs, rt`
    Sub,
    /// `and rd, rs, rt`
    And,
    /// `or rd, rs, rt`
    Or,
    /// `mult rd, rs, rt`
    Mult,
    /// `addi rt, rs, imm`
    Addi,
    /// `subi rt, rs, imm`
    Subi,
    /// `andi rt, rs, imm`
    Andi,
    /// `ori rt, rs, imm`
    Ori,
    /// `multi rt, rs, imm`
    Multi,
    /// `lw rs, imm(rt)` — the loaded value's destination is `rs`, not
    /// `rt`. See [`crate::Instruction`] docs.
    Lw,
    /// `sw rs, imm(rt)`
    Sw,
    /// `li rt, imm`
    Li,
    /// `beq rs, rt, label`
    Beq,
    /// `bne rs, rt, label`
    Bne,
    /// `j label`
    J,
    /// `hlt`
    Hlt,
    /// A pipeline bubble. Also the sentinel initial pipeline contents.
    Nop,
    /// The synthetic terminator enqueued once `hlt` has drained the
    /// pipeline, distinguishing "halt has retired" from "still running".
    Stop,
}

impl Opcode {
    /// Returns `true` for the three-register R-type arithmetic/logic ops.
    pub const fn is_r_type(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::And | Self::Or | Self::Mult)
    }

    /// Returns `true` for the immediate-operand arithmetic/logic ops.
    pub const fn is_i_type(self) -> bool {
        matches!(self, Self::Addi | Self::Subi | Self::Andi | Self::Ori | Self::Multi)
    }

    /// Returns `true` for `mult`/`multi`, whose result is not available a
    /// cycle early the way other arithmetic ops' results are.
    pub const fn is_multiply(self) -> bool {
        matches!(self, Self::Mult | Self::Multi)
    }

    /// Returns `true` for `add`/`sub`/`addi`/`subi`, the ops the add/sub
    /// hazard predicate watches for.
    pub const fn is_add_sub(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Addi | Self::Subi)
    }

    /// Returns `true` for `lw`/`sw`.
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Lw | Self::Sw)
    }

    /// Returns `true` for `beq`/`bne`.
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::Beq | Self::Bne)
    }

    /// Returns `true` for instructions that retire with the full five-stage
    /// timestamp line (i.e. everything except branches, `j`, `nop`, and
    /// `stop`).
    pub const fn emits_full_timestamps(self) -> bool {
        !matches!(self, Self::Beq | Self::Bne | Self::J | Self::Nop | Self::Stop)
    }

    /// A short upper-case mnemonic, used by the pipeline dump and debug
    /// output.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Mult => "MULT",
            Self::Addi => "ADDI",
            Self::Subi => "SUBI",
            Self::Andi => "ANDI",
            Self::Ori => "ORI",
            Self::Multi => "MULTI",
            Self::Lw => "LW",
            Self::Sw => "SW",
            Self::Li => "LI",
            Self::Beq => "BEQ",
            Self::Bne => "BNE",
            Self::J => "J",
            Self::Hlt => "HLT",
            Self::Nop => "NOP",
            Self::Stop => "STOP",
        }
    }
}
