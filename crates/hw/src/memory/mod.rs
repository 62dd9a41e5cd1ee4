//! Main memory, the instruction/data caches, the write buffer, and the
//! arbiter that lets instruction fetch, data access, and write-buffer
//! drain share one single-ported memory.

mod arbiter;
pub use arbiter::{MemOutcome, MemoryArbiter};

mod cache;
pub use cache::Cache;

mod main_memory;
pub use main_memory::{MainMemory, DATA_SEGMENT_BASE, RAM_WORDS};

mod word;
pub use word::Word;

mod write_buffer;
pub use write_buffer::{DrainOutcome, WriteBuffer};
