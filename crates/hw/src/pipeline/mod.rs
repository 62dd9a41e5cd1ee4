//! The pipeline engine: per-stage dispatch functions plus the tick loop
//! that sequences them against the shared engine state.

mod stages;
pub use stages::{ex1_stage, ex2_stage, ex3_stage, id_stage, mem_stage, wb_stage};

mod engine;
pub use engine::{PipelineEngine, TickReport, PIPELINE_SLOTS, TERMINAL_PC};
