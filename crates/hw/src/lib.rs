//! Hardware components of the six-stage pipeline simulator.
//!
//! This crate is the "hardware" half of the simulator: the architectural
//! register file, the three forwarding buffers and hazard predicates, the
//! instruction/data caches and the single-ported memory arbiter that
//! multiplexes fetch, data access, and write-buffer drain over them, and the
//! pipeline engine that sequences all of it one clock tick at a time.
#![warn(missing_debug_implementations, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod errors;
pub use errors::{PipelineError, PipelineResult};

mod control;
pub use control::Control;

mod register_file;
pub use register_file::RegisterFile;

mod forwarding;
pub use forwarding::{ForwardingBuffers, ForwardingTable};

mod hazard;
pub use hazard::{add_sub_hazard, destination_register, load_word_hazard, multiply_hazard, HazardWindow};

pub mod memory;

pub mod pipeline;
pub use pipeline::{PipelineEngine, TickReport};
