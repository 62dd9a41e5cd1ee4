//! The pipeline engine: the tick loop, program counter, clock, and the
//! stall/flush protocol that ties the stage functions together.

use alloc::collections::VecDeque;
use alloc::string::String;

use sixstage_isa::{Instruction, Opcode, Stage};

use crate::control::Control;
use crate::errors::PipelineError;
use crate::forwarding::ForwardingBuffers;
use crate::hazard::HazardWindow;
use crate::memory::{MemOutcome, MemoryArbiter, Word};
use crate::register_file::RegisterFile;

use super::stages::{ex1_stage, ex2_stage, ex3_stage, id_stage, mem_stage, wb_stage};

/// The sentinel program-counter value meaning "no more fetches".
pub const TERMINAL_PC: i32 = -1;

/// The program counter's value before the first tick, chosen so the first
/// tick's step-1 increment lands on address 0.
const INITIAL_PC: i32 = -4;

/// Number of in-flight pipeline slots, always exactly six.
pub const PIPELINE_SLOTS: usize = 6;

/// What happened during one call to [`PipelineEngine::tick`].
#[derive(Debug, Clone)]
pub struct TickReport {
    /// The clock tick just completed.
    pub clock: u64,
    /// The rendered pipeline snapshot, if pipeline dumping is enabled.
    pub dump_line: Option<String>,
    /// The retiring instruction's output line, if it emits one.
    pub output_line: Option<String>,
    /// `true` once the simulation has reached `stop` with an empty write
    /// buffer — the caller should stop calling `tick` and emit final stats.
    pub done: bool,
}

/// Owns every piece of simulator state: the six-slot pipeline, the register
/// file, the three forwarding buffers, the memory arbiter, the program
/// counter, and the clock.
#[derive(Debug, Clone)]
pub struct PipelineEngine {
    pipeline: VecDeque<Instruction>,
    regs: RegisterFile,
    fwd: ForwardingBuffers,
    mem: MemoryArbiter,
    pc: i32,
    clock: u64,
    pipeline_dump: bool,
}

impl PipelineEngine {
    /// Builds an engine with the pipeline primed with six `nop` bubbles,
    /// `instructions` and `data` loaded into main memory, and the program
    /// counter positioned so the first tick fetches instruction 0.
    pub fn new(
        instructions: impl IntoIterator<Item = Instruction>,
        data: impl IntoIterator<Item = i32>,
        pipeline_dump: bool,
    ) -> Self {
        let mut pipeline = VecDeque::with_capacity(PIPELINE_SLOTS);
        for _ in 0..PIPELINE_SLOTS {
            pipeline.push_back(Instruction::nop());
        }
        Self {
            pipeline,
            regs: RegisterFile::new(),
            fwd: ForwardingBuffers::new(),
            mem: MemoryArbiter::new(instructions, data),
            pc: INITIAL_PC,
            clock: 0,
            pipeline_dump,
        }
    }

    /// The register file, for diagnostics and testing.
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Instruction cache access-request count.
    pub fn i_cache_requests(&self) -> u64 {
        self.mem.i_requests()
    }

    /// Instruction cache hit count.
    pub fn i_cache_hits(&self) -> u64 {
        self.mem.i_hits()
    }

    /// Data cache access-request count.
    pub fn d_cache_requests(&self) -> u64 {
        self.mem.d_requests()
    }

    /// Data cache hit count.
    pub fn d_cache_hits(&self) -> u64 {
        self.mem.d_hits()
    }

    /// `true` once the write buffer holds nothing and isn't mid-drain.
    pub fn write_buffer_empty(&self) -> bool {
        self.mem.write_buffer_empty()
    }

    /// The current simulated clock.
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    fn render_dump(&self) -> String {
        let mut line = String::new();
        for (index, instr) in self.pipeline.iter().enumerate() {
            if index > 0 {
                line.push_str("  =>  ");
            }
            line.push_str(instr.opcode.mnemonic());
        }
        line
    }

    /// Looks up the original source text of the instruction word at
    /// `address`, for a flushed filler `nop`'s output line. Reads RAM
    /// directly rather than through the I-cache: see
    /// [`MemoryArbiter::peek_ram`].
    fn filler_source_at(&self, address: i32) -> String {
        if address < 0 {
            return String::new();
        }
        match self.mem.peek_ram(address as u32) {
            Word::Instruction(instr) => instr.source,
            Word::Data(_) => String::new(),
        }
    }

    /// Runs `MEM`, `EX3`, `EX2`, `EX1`, `ID` in that order on the five
    /// occupants remaining after this tick's `WB` pop. Short-circuits as
    /// soon as any call raises `Stall`; `EX1`'s alignment fault is the only
    /// fatal error this chain can propagate.
    fn run_stage_chain(&mut self) -> Result<Control, PipelineError> {
        let slice = self.pipeline.make_contiguous();
        debug_assert_eq!(slice.len(), PIPELINE_SLOTS - 1);

        match mem_stage(&mut slice[4], &mut self.fwd, &mut self.mem, self.clock)? {
            Control::Continue => {}
            other => return Ok(other),
        }
        ex3_stage(&mut slice[3], &mut self.fwd, self.clock);
        ex2_stage(&mut slice[2], &mut self.fwd);
        ex1_stage(&mut slice[1], &mut self.fwd)?;

        let (left, right) = slice.split_at_mut(1);
        let window = HazardWindow { ex1: &right[0], ex2: &right[1], ex3: &right[2], mem: &right[3] };
        Ok(id_stage(&mut left[0], &self.regs, &mut self.fwd, window, &mut self.pc, self.clock))
    }

    /// Advances the simulation by exactly one clock tick.
    pub fn tick(&mut self) -> Result<TickReport, PipelineError> {
        self.clock += 1;

        let dump_line = self.pipeline_dump.then(|| self.render_dump());

        if self.pc != TERMINAL_PC {
            self.pc += 4;
        }
        let fetch_pc_snapshot = self.pc;

        let mut retired = self.pipeline.pop_back().expect("pipeline always holds six slots");
        wb_stage(&mut retired, &mut self.regs, self.clock);
        let output_line = retired.output_line();
        let retired_was_stop = retired.opcode == Opcode::Stop;

        self.mem.try_empty_write_buffer();

        let control = self.run_stage_chain()?;

        if retired_was_stop && self.mem.write_buffer_empty() {
            return Ok(TickReport { clock: self.clock, dump_line, output_line, done: true });
        }

        match control {
            Control::Continue => {
                if self.pc < 0 {
                    self.pipeline.push_front(Instruction::stop());
                } else {
                    match self.mem.fetch_i(self.pc as u32)? {
                        MemOutcome::Ready(instr) => {
                            let is_hlt = instr.opcode == Opcode::Hlt;
                            self.pipeline.push_front(instr);
                            if is_hlt {
                                self.pc = TERMINAL_PC;
                            }
                        }
                        MemOutcome::Stall(Stage::If) => {
                            self.pipeline.push_front(Instruction::nop());
                            self.pc -= 4;
                        }
                        MemOutcome::Stall(Stage::Mem) => {
                            self.pipeline.push_back(Instruction::nop());
                            self.pc -= 4;
                        }
                        MemOutcome::Stall(other) => {
                            unreachable!("fetch_i never raises a stall at {other:?}")
                        }
                    }
                }
            }
            Control::Stall(Stage::If) => {
                self.pipeline.push_front(Instruction::nop());
                if self.pc != TERMINAL_PC {
                    self.pc -= 4;
                }
            }
            Control::Stall(Stage::Mem) => {
                self.pipeline.push_back(Instruction::nop());
                if self.pc != TERMINAL_PC {
                    self.pc -= 4;
                }
            }
            Control::Stall(Stage::Id) => {
                self.pipeline.insert(1, Instruction::nop());
                if self.pc != TERMINAL_PC {
                    self.pc -= 4;
                }
            }
            Control::Stall(other) => unreachable!("no stage call raises a stall at {other:?}"),
            Control::Flush => {
                let filler_source = self.filler_source_at(fetch_pc_snapshot);
                self.pipeline.push_front(Instruction::flushed_filler(filler_source));
            }
        }

        debug_assert_eq!(self.pipeline.len(), PIPELINE_SLOTS);
        self.pipeline[0].record_timestamp(Stage::If, self.clock);

        Ok(TickReport { clock: self.clock, dump_line, output_line, done: false })
    }
}

impl core::fmt::Display for TickReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "tick {}", self.clock)
    }
}

#[cfg(test)]
mod test {
    use alloc::vec;

    use super::*;

    fn run_to_completion(mut engine: PipelineEngine) -> PipelineEngine {
        for _ in 0..10_000 {
            if engine.tick().unwrap().done {
                return engine;
            }
        }
        panic!("engine did not terminate within 10,000 ticks");
    }

    #[test]
    fn li_and_add_retire_with_the_expected_result() {
        let program = vec![
            Instruction::li(1, 3, "li r1, 3".into()).unwrap(),
            Instruction::li(2, 4, "li r2, 4".into()).unwrap(),
            Instruction::r_type(Opcode::Add, 3, 1, 2, "add r3, r1, r2".into()),
            Instruction::hlt("hlt".into()),
        ];
        let engine = run_to_completion(PipelineEngine::new(program, vec![], false));
        assert_eq!(engine.registers().snapshot()[3], 7);
    }

    #[test]
    fn a_raw_dependent_add_is_resolved_by_forwarding_without_stalling() {
        let program = vec![
            Instruction::li(1, 3, "li r1, 3".into()).unwrap(),
            Instruction::r_type(Opcode::Add, 2, 1, 1, "add r2, r1, r1".into()),
            Instruction::hlt("hlt".into()),
        ];
        let engine = run_to_completion(PipelineEngine::new(program, vec![], false));
        assert_eq!(engine.registers().snapshot()[2], 6);
    }

    #[test]
    fn a_taken_branch_flushes_its_delay_slot() {
        let program = vec![
            Instruction::li(1, 1, "li r1, 1".into()).unwrap(),
            Instruction::li(2, 1, "li r2, 1".into()).unwrap(),
            Instruction::branch(Opcode::Beq, 1, 2, 4, "beq r1, r2, L".into()),
            Instruction::li(4, 99, "li r4, 99".into()).unwrap(),
            Instruction::li(3, 7, "li r3, 7".into()).unwrap(),
            Instruction::hlt("hlt".into()),
        ];
        let engine = run_to_completion(PipelineEngine::new(program, vec![], false));
        assert_eq!(engine.registers().snapshot()[3], 7);
        assert_eq!(engine.registers().snapshot()[4], 0);
    }

    #[test]
    fn write_buffer_drains_before_the_engine_reports_done() {
        let program = vec![
            Instruction::li(1, 42, "li r1, 42".into()).unwrap(),
            Instruction::li(2, 256, "li r2, 256".into()).unwrap(),
            Instruction::memory(Opcode::Sw, 1, 2, 0, "sw r1, 0(r2)".into()).unwrap(),
            Instruction::hlt("hlt".into()),
        ];
        let engine = run_to_completion(PipelineEngine::new(program, vec![], false));
        assert!(engine.write_buffer_empty());
    }

    #[test]
    fn missing_halt_surfaces_as_a_pipeline_error() {
        let program = vec![Instruction::li(1, 1, "li r1, 1".into()).unwrap()];
        let mut engine = PipelineEngine::new(program, vec![], false);
        let err = (0..10_000)
            .find_map(|_| engine.tick().err())
            .expect("falling off the program should raise MissingHalt");
        assert!(matches!(err, PipelineError::MissingHalt(_)));
    }
}
