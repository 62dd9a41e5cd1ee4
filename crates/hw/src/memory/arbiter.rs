//! The single-ported main-memory arbiter: instruction cache, data cache,
//! and write buffer compete for access to [`MainMemory`] through this type.

use sixstage_isa::{Instruction, Stage};

use crate::errors::PipelineError;

use super::cache::Cache;
use super::main_memory::MainMemory;
use super::word::Word;
use super::write_buffer::{DrainOutcome, WriteBuffer};

/// Cycles an I-cache fill takes once started: 8 words at 3 cycles each,
/// minus the one cycle already consumed raising the stall that started it.
const I_FILL_CYCLES: u32 = 23;

/// Cycles a D-cache fill takes once started.
const D_FILL_CYCLES: u32 = 11;

/// What a memory access accomplished this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOutcome<T> {
    /// The access completed; here is its result.
    Ready(T),
    /// The access is still in flight; the engine must stall at `Stage`.
    Stall(Stage),
}

/// Owns main memory, both caches, the write buffer, and the busy/timer
/// state the single shared port arbitrates between them.
#[derive(Debug, Clone)]
pub struct MemoryArbiter {
    ram: MainMemory,
    i_cache: Cache<2, 8>,
    d_cache: Cache<4, 4>,
    write_buffer: WriteBuffer,

    if_busy: bool,
    i_timer: u32,
    mem_busy: bool,
    d_timer: u32,

    i_requests: u64,
    i_hits: u64,
    d_requests: u64,
    d_hits: u64,
}

impl Default for MemoryArbiter {
    fn default() -> Self {
        Self {
            ram: MainMemory::new(),
            i_cache: Cache::new(),
            d_cache: Cache::new(),
            write_buffer: WriteBuffer::new(),
            if_busy: false,
            i_timer: 0,
            mem_busy: false,
            d_timer: 0,
            i_requests: 0,
            i_hits: 0,
            d_requests: 0,
            d_hits: 0,
        }
    }
}

impl MemoryArbiter {
    /// Builds an arbiter with fresh (empty) caches and write buffer, loading
    /// `instructions` at word 0 and `data` at the data segment base.
    pub fn new(instructions: impl IntoIterator<Item = Instruction>, data: impl IntoIterator<Item = i32>) -> Self {
        let mut arbiter = Self::default();
        arbiter.ram.load_program(instructions);
        arbiter.ram.load_data(data);
        arbiter
    }

    fn instruction_from_word(word: Word, address: u32) -> Result<Instruction, PipelineError> {
        match word {
            Word::Instruction(instr) => Ok(instr.copy_of()),
            Word::Data(_) => Err(PipelineError::MissingHalt(address)),
        }
    }

    /// Fetches the instruction at `address` through the instruction cache.
    pub fn fetch_i(&mut self, address: u32) -> Result<MemOutcome<Instruction>, PipelineError> {
        if self.i_cache.hit(address) {
            self.i_requests += 1;
            self.i_hits += 1;
            let word = self.i_cache.fetch(address);
            return Ok(MemOutcome::Ready(Self::instruction_from_word(word, address)?));
        }

        if self.write_buffer.is_busy() {
            return Ok(MemOutcome::Stall(Stage::Mem));
        }

        if !self.if_busy {
            self.if_busy = true;
            self.i_timer = I_FILL_CYCLES;
            self.i_requests += 1;
            return Ok(MemOutcome::Stall(Stage::If));
        }

        if self.i_timer == 0 {
            self.if_busy = false;
            self.i_cache.populate(address, &self.ram);
            let word = self.i_cache.fetch(address);
            return Ok(MemOutcome::Ready(Self::instruction_from_word(word, address)?));
        }

        self.i_timer -= 1;
        Ok(MemOutcome::Stall(Stage::If))
    }

    /// Drives the D-cache's shared busy/timer state machine, used by both
    /// reads and writes — they differ only in what they do once the cache
    /// line is actually resident.
    fn advance_d_cache(&mut self, address: u32) -> MemOutcome<()> {
        if self.d_cache.hit(address) {
            self.d_requests += 1;
            self.d_hits += 1;
            return MemOutcome::Ready(());
        }

        if self.i_timer > 0 {
            self.i_timer -= 1;
            return MemOutcome::Stall(Stage::Mem);
        }

        if self.write_buffer.is_busy() {
            return MemOutcome::Stall(Stage::Mem);
        }

        if !self.mem_busy {
            self.mem_busy = true;
            self.d_timer = D_FILL_CYCLES;
            self.d_requests += 1;
            return MemOutcome::Stall(Stage::Mem);
        }

        if self.d_timer == 0 {
            self.mem_busy = false;
            self.d_cache.populate(address, &self.ram);
            return MemOutcome::Ready(());
        }

        self.d_timer -= 1;
        MemOutcome::Stall(Stage::Mem)
    }

    /// Reads a data word at `address` through the data cache.
    pub fn fetch_data(&mut self, address: u32) -> MemOutcome<i32> {
        match self.advance_d_cache(address) {
            MemOutcome::Ready(()) => MemOutcome::Ready(self.d_cache.fetch(address).expect_data()),
            MemOutcome::Stall(stage) => MemOutcome::Stall(stage),
        }
    }

    /// Writes `value` at `address`: updates the D-cache (once resident) and
    /// enqueues the write into the write buffer for eventual drain into RAM.
    pub fn write_word(&mut self, value: i32, address: u32) -> MemOutcome<()> {
        match self.advance_d_cache(address) {
            MemOutcome::Ready(()) => {
                self.d_cache.write(Word::Data(value), address);
                self.write_buffer.enqueue(Word::Data(value), address);
                MemOutcome::Ready(())
            }
            MemOutcome::Stall(stage) => MemOutcome::Stall(stage),
        }
    }

    /// Attempts to drain one write-buffer entry this tick.
    pub fn try_empty_write_buffer(&mut self) -> DrainOutcome {
        let port_free = self.i_timer == 0 && self.d_timer == 0;
        self.write_buffer.try_drain(&mut self.ram, port_free)
    }

    /// `true` if the write buffer holds no pending writes and isn't
    /// mid-drain.
    pub fn write_buffer_empty(&self) -> bool {
        self.write_buffer.is_empty()
    }

    /// Reads a word directly from RAM, bypassing the cache/arbiter entirely.
    ///
    /// Used only to recover the original source text of a speculatively
    /// fetched instruction that a taken branch discards — the flushed
    /// filler `nop`'s output line needs that text, but charging the I-cache
    /// for an access whose result is thrown away would corrupt the cache
    /// statistics the rest of the engine relies on for its stall
    /// accounting.
    pub fn peek_ram(&self, address: u32) -> Word {
        self.ram.read_word(address)
    }

    /// Instruction cache access-request count.
    pub const fn i_requests(&self) -> u64 {
        self.i_requests
    }

    /// Instruction cache hit count.
    pub const fn i_hits(&self) -> u64 {
        self.i_hits
    }

    /// Data cache access-request count.
    pub const fn d_requests(&self) -> u64 {
        self.d_requests
    }

    /// Data cache hit count.
    pub const fn d_hits(&self) -> u64 {
        self.d_hits
    }
}

#[cfg(test)]
mod test {
    use sixstage_isa::Instruction;

    use super::*;

    fn run_until_ready<T>(mut poll: impl FnMut() -> MemOutcome<T>) -> T {
        for _ in 0..64 {
            if let MemOutcome::Ready(value) = poll() {
                return value;
            }
        }
        panic!("did not resolve within 64 ticks");
    }

    #[test]
    fn instruction_fetch_misses_once_then_hits() {
        let program = [
            Instruction::hlt("hlt".into()),
            Instruction::hlt("hlt".into()),
        ];
        let mut arbiter = MemoryArbiter::new(program, []);

        let instr = run_until_ready(|| arbiter.fetch_i(0).unwrap());
        assert_eq!(instr.opcode, sixstage_isa::Opcode::Hlt);
        assert_eq!(arbiter.i_requests(), 1);
        assert_eq!(arbiter.i_hits(), 0);

        // Same block, already resident: a hit.
        assert!(matches!(arbiter.fetch_i(4).unwrap(), MemOutcome::Ready(_)));
        assert_eq!(arbiter.i_requests(), 2);
        assert_eq!(arbiter.i_hits(), 1);
    }

    #[test]
    fn fetch_i_copy_of_keeps_independent_timestamps() {
        let mut arbiter = MemoryArbiter::new([Instruction::hlt("hlt".into())], []);
        let mut first = run_until_ready(|| arbiter.fetch_i(0).unwrap());
        first.record_timestamp(sixstage_isa::Stage::If, 5);
        let second = run_until_ready(|| arbiter.fetch_i(0).unwrap());
        assert_eq!(second.timestamp(sixstage_isa::Stage::If), 0);
    }

    #[test]
    fn data_read_after_write_sees_the_written_value() {
        let mut arbiter = MemoryArbiter::new([Instruction::hlt("hlt".into())], []);
        run_until_ready(|| arbiter.write_word(42, 0x100));
        let value = run_until_ready(|| arbiter.fetch_data(0x100));
        assert_eq!(value, 42);
    }

    #[test]
    fn write_enqueues_into_the_write_buffer() {
        let mut arbiter = MemoryArbiter::new([Instruction::hlt("hlt".into())], []);
        assert!(arbiter.write_buffer_empty());
        run_until_ready(|| arbiter.write_word(7, 0x100));
        assert!(!arbiter.write_buffer_empty());
    }

    #[test]
    fn peek_ram_does_not_affect_cache_statistics() {
        let arbiter = MemoryArbiter::new([Instruction::hlt("hlt line".into())], []);
        let word = arbiter.peek_ram(0);
        assert!(word.as_instruction().is_some());
        assert_eq!(arbiter.i_requests(), 0);
    }

    #[test]
    fn falling_off_the_program_without_hlt_is_missing_halt() {
        let mut arbiter = MemoryArbiter::new(Vec::<Instruction>::new(), []);
        let mut result = None;
        for _ in 0..64 {
            match arbiter.fetch_i(0) {
                Ok(MemOutcome::Stall(_)) => continue,
                Ok(MemOutcome::Ready(_)) => panic!("a data word should not resolve as Ready"),
                Err(err) => {
                    result = Some(err);
                    break;
                }
            }
        }
        assert!(matches!(result, Some(PipelineError::MissingHalt(0))));
    }
}
