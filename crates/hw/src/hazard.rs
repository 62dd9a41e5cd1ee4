//! Hazard detection predicates.
//!
//! Each predicate answers "is the value this consumer needs unavailable to
//! even the forwarding network yet?" — the producer's result genuinely
//! isn't computed at the cycle the consumer's ID needs it, so the only
//! option is to stall.

use sixstage_isa::{Instruction, Opcode};

/// The register a producer at a given pipeline slot would eventually
/// write, as a single match over the opcode rather than a family of
/// instance-of checks.
pub fn destination_register(instr: &Instruction) -> Option<u8> {
    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Mult => Some(instr.rd),
        Opcode::Addi | Opcode::Subi | Opcode::Andi | Opcode::Ori | Opcode::Multi | Opcode::Li => {
            Some(instr.rt)
        }
        Opcode::Lw => Some(instr.rs),
        _ => None,
    }
}

/// The EX1/EX2/EX3/MEM occupants a hazard predicate inspects, named by their
/// role this tick rather than their pipeline slot index.
#[derive(Debug, Clone, Copy)]
pub struct HazardWindow<'a> {
    /// The instruction about to run EX1 this tick.
    pub ex1: &'a Instruction,
    /// The instruction about to run EX2 this tick.
    pub ex2: &'a Instruction,
    /// The instruction about to run EX3 this tick.
    pub ex3: &'a Instruction,
    /// The instruction about to run MEM this tick.
    pub mem: &'a Instruction,
}

/// True if any of EX1, EX2, EX3 (plus MEM when `extended`) is a `lw` whose
/// destination register is one of `regs`. Branches pass `extended = true`
/// since their decision is made a cycle earlier than a normal consumer's.
pub fn load_word_hazard(window: HazardWindow<'_>, regs: &[u8], extended: bool) -> bool {
    let stages: [&Instruction; 4] = [window.ex1, window.ex2, window.ex3, window.mem];
    let count = if extended { 4 } else { 3 };
    stages[..count].iter().any(|instr| {
        instr.opcode == Opcode::Lw && destination_register(instr).is_some_and(|d| regs.contains(&d))
    })
}

/// True if EX1 (plus EX2 when `extended`) is `mult`/`multi` writing to one
/// of `regs`.
pub fn multiply_hazard(window: HazardWindow<'_>, regs: &[u8], extended: bool) -> bool {
    let stages: [&Instruction; 2] = [window.ex1, window.ex2];
    let count = if extended { 2 } else { 1 };
    stages[..count].iter().any(|instr| {
        instr.opcode.is_multiply() && destination_register(instr).is_some_and(|d| regs.contains(&d))
    })
}

/// True if EX1 (plus EX2 when `extended`) is `add`/`sub`/`addi`/`subi`
/// writing to one of `regs`.
pub fn add_sub_hazard(window: HazardWindow<'_>, regs: &[u8], extended: bool) -> bool {
    let stages: [&Instruction; 2] = [window.ex1, window.ex2];
    let count = if extended { 2 } else { 1 };
    stages[..count].iter().any(|instr| {
        instr.opcode.is_add_sub() && destination_register(instr).is_some_and(|d| regs.contains(&d))
    })
}
