//! A generic direct-mapped cache, parameterized by block count and words
//! per block, shared by the instruction and data caches.

use super::main_memory::MainMemory;
use super::word::Word;

const BYTE_OFFSET_BITS: u32 = 2;

const fn log2_floor(mut value: usize) -> u32 {
    let mut bits = 0;
    value >>= 1;
    while value > 0 {
        bits += 1;
        value >>= 1;
    }
    bits
}

/// A direct-mapped cache of `BLOCKS` blocks, each `WORDS_PER_BLOCK` words
/// wide, write-through via the caller's write buffer.
///
/// The instruction cache instantiates this as `Cache<2, 8>`; the data cache
/// as `Cache<4, 4>`.
#[derive(Debug, Clone)]
pub struct Cache<const BLOCKS: usize, const WORDS_PER_BLOCK: usize> {
    blocks: [[Word; WORDS_PER_BLOCK]; BLOCKS],
    tags: [u32; BLOCKS],
    valid: [bool; BLOCKS],
}

impl<const BLOCKS: usize, const WORDS_PER_BLOCK: usize> Default for Cache<BLOCKS, WORDS_PER_BLOCK> {
    fn default() -> Self {
        Self {
            blocks: core::array::from_fn(|_| core::array::from_fn(|_| Word::default())),
            tags: [0; BLOCKS],
            valid: [false; BLOCKS],
        }
    }
}

impl<const BLOCKS: usize, const WORDS_PER_BLOCK: usize> Cache<BLOCKS, WORDS_PER_BLOCK> {
    const WORD_INDEX_BITS: u32 = log2_floor(WORDS_PER_BLOCK);

    /// Builds an empty (all-invalid) cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(address: u32) -> (usize, u32, usize) {
        let composite = address >> (BYTE_OFFSET_BITS + Self::WORD_INDEX_BITS);
        let block_index = (composite as usize) % BLOCKS;
        let tag = composite / (BLOCKS as u32);
        let word_mask = (1u32 << Self::WORD_INDEX_BITS) - 1;
        let word_index = ((address >> BYTE_OFFSET_BITS) & word_mask) as usize;
        (block_index, tag, word_index)
    }

    /// `true` if `address` is currently resident (valid and tag-matched).
    pub fn hit(&self, address: u32) -> bool {
        let (block_index, tag, _) = Self::decode(address);
        self.valid[block_index] && self.tags[block_index] == tag
    }

    /// Returns the word at `address` from a hit block. Behavior is undefined
    /// (panics) if the block is not resident — callers must check
    /// [`Cache::hit`] first.
    pub fn fetch(&self, address: u32) -> Word {
        let (block_index, _, word_index) = Self::decode(address);
        self.blocks[block_index][word_index].clone()
    }

    /// Writes `word` directly into the cached block at `address`. Callers
    /// must ensure the block is resident first.
    pub fn write(&mut self, word: Word, address: u32) {
        let (block_index, _, word_index) = Self::decode(address);
        self.blocks[block_index][word_index] = word;
    }

    /// Installs the whole block containing `address`, reading sequentially
    /// from `ram` starting at the block's base address.
    pub fn populate(&mut self, address: u32, ram: &MainMemory) {
        let (block_index, tag, word_index) = Self::decode(address);
        let block_size_bytes = (WORDS_PER_BLOCK as u32) * 4;
        let base = address - (word_index as u32) * 4;
        debug_assert_eq!(base % block_size_bytes, 0);

        for offset in 0..WORDS_PER_BLOCK {
            self.blocks[block_index][offset] = ram.read_word(base + (offset as u32) * 4);
        }
        self.tags[block_index] = tag;
        self.valid[block_index] = true;
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[test]
    fn fresh_cache_misses_everywhere() {
        let cache: Cache<2, 8> = Cache::new();
        assert!(!cache.hit(0));
        assert!(!cache.hit(0x100));
    }

    #[test]
    fn populate_then_hit_on_every_word_in_the_block() {
        let mut ram = MainMemory::new();
        for word in 0..8 {
            ram.write_word(word * 4, Word::Data(word as i32));
        }
        let mut cache: Cache<2, 8> = Cache::new();
        cache.populate(0, &ram);
        for word in 0..8 {
            let address = word * 4;
            assert!(cache.hit(address));
            assert_eq!(cache.fetch(address), Word::Data(word as i32));
        }
    }

    #[rstest]
    // 0x20 apart lands in the other of the 2 blocks: no eviction.
    #[case(0x00, 0x20, true)]
    // 0x40 apart wraps back to the same block index with a different tag:
    // populating `second` evicts `first`.
    #[case(0x00, 0x40, false)]
    fn populating_a_different_block_evicts_or_shares(
        #[case] first: u32,
        #[case] second: u32,
        #[case] first_still_resident: bool,
    ) {
        let ram = MainMemory::new();
        let mut cache: Cache<2, 8> = Cache::new();
        cache.populate(first, &ram);
        cache.populate(second, &ram);
        assert_eq!(cache.hit(first), first_still_resident);
        assert!(cache.hit(second));
    }

    #[test]
    fn write_updates_only_the_target_word() {
        let ram = MainMemory::new();
        let mut cache: Cache<4, 4> = Cache::new();
        cache.populate(0, &ram);
        cache.write(Word::Data(77), 4);
        assert_eq!(cache.fetch(4), Word::Data(77));
        assert_eq!(cache.fetch(0), Word::Data(0));
    }
}
