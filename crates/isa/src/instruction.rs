//! The instruction record: immutable descriptor plus mutable per-execution
//! scratch space.

use alloc::string::String;

use crate::{IsaError, Opcode, Stage, IMMEDIATE_MAX, IMMEDIATE_MIN};

/// A single instruction's descriptor and its in-flight execution scratch.
///
/// An `Instruction` is built once by the assembler (or by a cache populating
/// a block from RAM) and then travels down the pipeline, accumulating
/// operand snapshots, a computed result, and a stage-exit timestamp per slot
/// it passes through. [`Instruction::copy_of`] produces a fresh execution
/// record sharing the same descriptor but with scratch reset, which is what
/// the instruction cache hands out on every fetch so that two in-flight
/// occurrences of the same program location never alias mutable state.
///
/// Register operand naming follows the assembler's convention (first
/// register written is the destination) rather than the `rs`/`rt`/`rd`
/// roles a MIPS reader might expect by position. In particular `lw`
/// writes its loaded value into `rs`, not `rt` — preserved deliberately
/// rather than "fixed", since the textual assembler and every hazard and
/// forwarding computation already agree on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The opcode kind.
    pub opcode: Opcode,
    /// First register operand (destination for R-type/I-type arithmetic and
    /// for `lw`; first compared register for branches).
    pub rs: u8,
    /// Second register operand (source/base register for most variants).
    pub rt: u8,
    /// Third register operand, used only by R-type arithmetic (destination).
    pub rd: u8,
    /// Signed immediate (arithmetic/memory) or resolved branch/jump target
    /// instruction index, reused as the raw operand for the `imm*4 - 4`
    /// target computation.
    pub imm: i32,
    /// The raw user-typed source line, already left-padded by the assembler.
    /// Empty for a plain bubble; non-empty on a flushed-branch filler `nop`
    /// that records what would have come next.
    pub source: String,

    /// Snapshot of the first operand, refreshed by forwarding as the
    /// instruction moves through ID and EX1.
    pub op1: i32,
    /// Snapshot of the second operand.
    pub op2: i32,
    /// The computed result (arithmetic result, loaded word, or effective
    /// address), committed to the register file at WB.
    pub result: i32,
    /// Stage-exit clock timestamps, indexed by [`Stage::index`].
    pub timestamps: [u64; 5],
}

impl Instruction {
    fn bare(opcode: Opcode, rs: u8, rt: u8, rd: u8, imm: i32, source: String) -> Self {
        Self {
            opcode,
            rs,
            rt,
            rd,
            imm,
            source,
            op1: 0,
            op2: 0,
            result: 0,
            timestamps: [0; 5],
        }
    }

    fn check_immediate(imm: i32) -> Result<(), IsaError> {
        if (IMMEDIATE_MIN..=IMMEDIATE_MAX).contains(&imm) {
            Ok(())
        } else {
            Err(IsaError::ImmediateOutOfRange(imm))
        }
    }

    /// Builds an R-type arithmetic/logic instruction (`add`, `sub`, `and`,
    /// `or`, `mult`): `(rd, rs, rt)`, result written to `rd`.
    pub fn r_type(opcode: Opcode, rd: u8, rs: u8, rt: u8, source: String) -> Self {
        debug_assert!(opcode.is_r_type());
        Self::bare(opcode, rs, rt, rd, 0, source)
    }

    /// Builds an I-type arithmetic/logic instruction (`addi`, `subi`,
    /// `andi`, `ori`, `multi`): `(rt, rs, imm)`, result written to `rt`.
    ///
    /// Fails if `imm` does not fit a signed 16-bit field.
    pub fn i_type(opcode: Opcode, rt: u8, rs: u8, imm: i32, source: String) -> Result<Self, IsaError> {
        debug_assert!(opcode.is_i_type());
        Self::check_immediate(imm)?;
        Ok(Self::bare(opcode, rs, rt, 0, imm, source))
    }

    /// Builds a memory-access instruction (`lw`, `sw`): `(rs, rt, imm)`,
    /// effective address `reg[rt] + imm`. The destination/source of the
    /// transferred value is `rs` (see struct docs).
    ///
    /// Fails if `imm` does not fit a signed 16-bit field. Alignment of the
    /// effective address cannot be checked here — it depends on the runtime
    /// value of `reg[rt]` — and is instead a fatal error raised during EX1.
    pub fn memory(opcode: Opcode, rs: u8, rt: u8, imm: i32, source: String) -> Result<Self, IsaError> {
        debug_assert!(opcode.is_memory());
        Self::check_immediate(imm)?;
        Ok(Self::bare(opcode, rs, rt, 0, imm, source))
    }

    /// Builds a `li rt, imm` instruction.
    pub fn li(rt: u8, imm: i32, source: String) -> Result<Self, IsaError> {
        Self::check_immediate(imm)?;
        Ok(Self::bare(Opcode::Li, 0, rt, 0, imm, source))
    }

    /// Builds a `beq`/`bne rs, rt, target_index` instruction. The target is
    /// a resolved instruction index, not range-checked against the 16-bit
    /// immediate bounds (program length is bounded separately, at 256
    /// words).
    pub fn branch(opcode: Opcode, rs: u8, rt: u8, target_index: i32, source: String) -> Self {
        debug_assert!(opcode.is_branch());
        Self::bare(opcode, rs, rt, 0, target_index, source)
    }

    /// Builds a `j target_index` instruction.
    pub fn jump(target_index: i32, source: String) -> Self {
        Self::bare(Opcode::J, 0, 0, 0, target_index, source)
    }

    /// Builds the `hlt` marker.
    pub fn hlt(source: String) -> Self {
        Self::bare(Opcode::Hlt, 0, 0, 0, 0, source)
    }

    /// Builds a plain pipeline bubble — empty source, emits nothing on
    /// retirement.
    pub fn nop() -> Self {
        Self::bare(Opcode::Nop, 0, 0, 0, 0, String::new())
    }

    /// Builds a flushed-branch filler bubble that carries the original text
    /// of the instruction it discarded, for output purposes only.
    pub fn flushed_filler(source: String) -> Self {
        Self::bare(Opcode::Nop, 0, 0, 0, 0, source)
    }

    /// Builds the synthetic `stop` terminator.
    pub fn stop() -> Self {
        Self::bare(Opcode::Stop, 0, 0, 0, 0, String::new())
    }

    /// `true` for a `nop` carrying captured source text from a flush.
    pub fn is_flushed_filler(&self) -> bool {
        self.opcode == Opcode::Nop && !self.source.is_empty()
    }

    /// Returns an independent execution record sharing this instruction's
    /// descriptor but with scratch (operand snapshots, result, timestamps)
    /// reset. Used by the instruction cache on every fetch.
    pub fn copy_of(&self) -> Self {
        Self::bare(self.opcode, self.rs, self.rt, self.rd, self.imm, self.source.clone())
    }

    /// Records the clock tick at which this instruction exited `stage`.
    pub fn record_timestamp(&mut self, stage: Stage, clock: u64) {
        self.timestamps[stage.index()] = clock;
    }

    /// The clock tick at which this instruction exited `stage`.
    pub fn timestamp(&self, stage: Stage) -> u64 {
        self.timestamps[stage.index()]
    }

    /// Formats this instruction's output-file line, if it retires with one.
    ///
    /// Returns `None` for a plain bubble and for the synthetic `stop`
    /// terminator, both of which are silent on retirement. A flushed-branch
    /// filler `nop` emits just its captured source text. Branches and `j`
    /// emit an abbreviated two-timestamp line; everything else emits the
    /// full five-timestamp line.
    pub fn output_line(&self) -> Option<String> {
        match self.opcode {
            Opcode::Stop => None,
            Opcode::Nop => {
                if self.is_flushed_filler() {
                    Some(self.source.clone())
                } else {
                    None
                }
            }
            Opcode::Beq | Opcode::Bne | Opcode::J => Some(alloc::format!(
                "{} {} {}",
                self.source,
                self.timestamp(Stage::If),
                self.timestamp(Stage::Id),
            )),
            _ => Some(alloc::format!(
                "{} {} {} {} {} {}",
                self.source,
                self.timestamp(Stage::If),
                self.timestamp(Stage::Id),
                self.timestamp(Stage::Ex),
                self.timestamp(Stage::Mem),
                self.timestamp(Stage::Wb),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(32767)]
    #[case(-32768)]
    #[case(0)]
    fn immediate_boundary_values_are_accepted(#[case] imm: i32) {
        assert!(Instruction::li(1, imm, "li r1, X".into()).is_ok());
    }

    #[rstest]
    #[case(32768)]
    #[case(-32769)]
    fn immediate_out_of_range_values_are_rejected(#[case] imm: i32) {
        let err = Instruction::li(1, imm, "li r1, X".into()).unwrap_err();
        assert_eq!(err, IsaError::ImmediateOutOfRange(imm));
    }

    #[test]
    fn copy_of_resets_scratch_but_shares_descriptor() {
        let mut original = Instruction::r_type(Opcode::Add, 3, 1, 2, "add r3, r1, r2".into());
        original.op1 = 5;
        original.op2 = 9;
        original.result = 14;
        original.record_timestamp(Stage::If, 1);

        let copy = original.copy_of();
        assert_eq!(copy.opcode, original.opcode);
        assert_eq!(copy.rd, original.rd);
        assert_eq!(copy.rs, original.rs);
        assert_eq!(copy.rt, original.rt);
        assert_eq!(copy.op1, 0);
        assert_eq!(copy.op2, 0);
        assert_eq!(copy.result, 0);
        assert_eq!(copy.timestamp(Stage::If), 0);
    }

    #[test]
    fn nop_and_stop_emit_no_output_line() {
        assert!(Instruction::nop().output_line().is_none());
        assert!(Instruction::stop().output_line().is_none());
    }

    #[test]
    fn flushed_filler_emits_bare_source_text() {
        let filler = Instruction::flushed_filler("li r3, 99".into());
        assert!(filler.is_flushed_filler());
        assert_eq!(filler.output_line().as_deref(), Some("li r3, 99"));
    }

    #[test]
    fn explicit_nop_is_not_a_flushed_filler() {
        assert!(!Instruction::nop().is_flushed_filler());
    }

    #[test]
    fn branch_output_line_has_two_timestamps() {
        let mut instr = Instruction::branch(Opcode::Beq, 1, 2, 4, "beq r1, r2, L".into());
        instr.record_timestamp(Stage::If, 1);
        instr.record_timestamp(Stage::Id, 2);
        assert_eq!(instr.output_line().as_deref(), Some("beq r1, r2, L 1 2"));
    }

    #[test]
    fn arithmetic_output_line_has_five_timestamps() {
        let mut instr = Instruction::r_type(Opcode::Add, 3, 1, 2, "add r3, r1, r2".into());
        for (stage, clock) in [(Stage::If, 1), (Stage::Id, 2), (Stage::Ex, 5), (Stage::Mem, 6), (Stage::Wb, 7)] {
            instr.record_timestamp(stage, clock);
        }
        assert_eq!(instr.output_line().as_deref(), Some("add r3, r1, r2 1 2 5 6 7"));
    }

    #[test]
    fn lw_destination_register_is_rs_not_rt() {
        let instr = Instruction::memory(Opcode::Lw, 1, 2, 0, "lw r1, 0(r2)".into()).unwrap();
        assert_eq!(instr.rs, 1);
        assert_eq!(instr.rt, 2);
    }
}
