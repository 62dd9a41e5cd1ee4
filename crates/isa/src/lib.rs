//! Opcode set and instruction record for the six-stage pipeline simulator.
//!
//! This crate is the "Instruction Variants" component of the simulator: a
//! closed set of opcode kinds, the per-instruction record that carries both
//! its immutable descriptor and the mutable scratch space it accumulates as
//! it travels through the pipeline, and the stage contract each opcode
//! implements.
#![warn(missing_debug_implementations, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod errors;
pub use errors::IsaError;

mod opcode;
pub use opcode::Opcode;

mod stage;
pub use stage::Stage;

mod instruction;
pub use instruction::Instruction;

/// The number of general-purpose registers in the register file.
pub const REGISTER_COUNT: usize = 32;

/// Lower and upper bounds of a signed 16-bit immediate, inclusive.
pub const IMMEDIATE_MIN: i32 = -32768;

/// Upper bound of a signed 16-bit immediate, inclusive.
pub const IMMEDIATE_MAX: i32 = 32767;
