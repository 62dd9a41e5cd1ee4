//! Per-opcode stage behavior, grouped into free functions matching on
//! [`Opcode`] rather than an instance-of hierarchy.

use sixstage_isa::{Instruction, Opcode, Stage};

use crate::control::Control;
use crate::errors::PipelineError;
use crate::forwarding::ForwardingBuffers;
use crate::hazard::{self, add_sub_hazard, load_word_hazard, multiply_hazard, HazardWindow};
use crate::memory::{MemOutcome, MemoryArbiter, RAM_WORDS};
use crate::register_file::RegisterFile;

fn apply(opcode: Opcode, rd: i32, rs: i32, rt: i32) -> i32 {
    match opcode {
        Opcode::Add | Opcode::Addi => rs.wrapping_add(rt),
        Opcode::Sub | Opcode::Subi => rs.wrapping_sub(rt),
        Opcode::And | Opcode::Andi => rs & rt,
        Opcode::Or | Opcode::Ori => rs | rt,
        Opcode::Mult | Opcode::Multi => rs.wrapping_mul(rt),
        _ => rd,
    }
}

/// Runs the ID stage for `instr`, which currently occupies the IF slot.
///
/// `window` names the current EX1/EX2/EX3/MEM occupants (already advanced
/// through their own stage calls this tick) for hazard checking. `pc` is
/// overwritten in place by a taken branch or by `j`.
pub fn id_stage(
    instr: &mut Instruction,
    regs: &RegisterFile,
    fwd: &mut ForwardingBuffers,
    window: HazardWindow<'_>,
    pc: &mut i32,
    clock: u64,
) -> Control {
    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Mult => {
            instr.op1 = regs.read(instr.rs);
            instr.op2 = regs.read(instr.rt);
            if let Some(v) = fwd.id_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            if let Some(v) = fwd.id_fwd.forward(instr.rt) {
                instr.op2 = v;
            }
            let regs_in_use = [instr.rs, instr.rt];
            if load_word_hazard(window, &regs_in_use, false)
                || multiply_hazard(window, &regs_in_use, false)
                || add_sub_hazard(window, &regs_in_use, false)
            {
                return Control::Stall(Stage::Id);
            }
            instr.record_timestamp(Stage::Id, clock);
            Control::Continue
        }
        Opcode::Addi | Opcode::Subi | Opcode::Andi | Opcode::Ori | Opcode::Multi => {
            instr.op1 = regs.read(instr.rs);
            if let Some(v) = fwd.id_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            let regs_in_use = [instr.rs];
            if load_word_hazard(window, &regs_in_use, false)
                || multiply_hazard(window, &regs_in_use, false)
                || add_sub_hazard(window, &regs_in_use, false)
            {
                return Control::Stall(Stage::Id);
            }
            instr.record_timestamp(Stage::Id, clock);
            Control::Continue
        }
        Opcode::Lw | Opcode::Sw => {
            instr.op1 = regs.read(instr.rs);
            instr.op2 = regs.read(instr.rt);
            if let Some(v) = fwd.id_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            if let Some(v) = fwd.id_fwd.forward(instr.rt) {
                instr.op2 = v;
            }
            let regs_in_use = [instr.rt];
            if load_word_hazard(window, &regs_in_use, false)
                || multiply_hazard(window, &regs_in_use, false)
                || add_sub_hazard(window, &regs_in_use, false)
            {
                return Control::Stall(Stage::Id);
            }
            instr.record_timestamp(Stage::Id, clock);
            Control::Continue
        }
        Opcode::Beq | Opcode::Bne => {
            instr.op1 = regs.read(instr.rs);
            instr.op2 = regs.read(instr.rt);
            if let Some(v) = fwd.id_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            if let Some(v) = fwd.id_fwd.forward(instr.rt) {
                instr.op2 = v;
            }
            let regs_in_use = [instr.rs, instr.rt];
            if load_word_hazard(window, &regs_in_use, true)
                || multiply_hazard(window, &regs_in_use, true)
                || add_sub_hazard(window, &regs_in_use, true)
            {
                return Control::Stall(Stage::Id);
            }
            instr.record_timestamp(Stage::Id, clock);
            let taken = match instr.opcode {
                Opcode::Beq => instr.op1 == instr.op2,
                Opcode::Bne => instr.op1 != instr.op2,
                _ => unreachable!(),
            };
            if taken {
                *pc = instr.imm.wrapping_mul(4) - 4;
                return Control::Flush;
            }
            Control::Continue
        }
        Opcode::J => {
            instr.record_timestamp(Stage::Id, clock);
            *pc = instr.imm.wrapping_mul(4) - 4;
            Control::Flush
        }
        Opcode::Li | Opcode::Hlt | Opcode::Nop | Opcode::Stop => {
            instr.record_timestamp(Stage::Id, clock);
            Control::Continue
        }
    }
}

/// Runs EX1: recomputes forwarding from `ex_fwd`, then computes the
/// arithmetic result or the memory effective address.
pub fn ex1_stage(instr: &mut Instruction, fwd: &mut ForwardingBuffers) -> Result<(), PipelineError> {
    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Mult => {
            if let Some(v) = fwd.ex_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            if let Some(v) = fwd.ex_fwd.forward(instr.rt) {
                instr.op2 = v;
            }
            instr.result = apply(instr.opcode, instr.rd, instr.op1, instr.op2);
        }
        Opcode::Addi | Opcode::Subi | Opcode::Andi | Opcode::Ori | Opcode::Multi => {
            if let Some(v) = fwd.ex_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            instr.result = apply(instr.opcode, instr.rt, instr.op1, instr.imm);
        }
        Opcode::Lw | Opcode::Sw => {
            if let Some(v) = fwd.ex_fwd.forward(instr.rt) {
                instr.op2 = v;
            }
            let address = instr.op2.wrapping_add(instr.imm);
            if address & 0b11 != 0 {
                return Err(PipelineError::UnalignedAddress(address as u32));
            }
            if address < 0 || (address as usize) >= RAM_WORDS * 4 {
                return Err(PipelineError::AddressOutOfBounds(address as u32, RAM_WORDS));
            }
            instr.result = address;
        }
        Opcode::Li => {
            fwd.id_fwd.fill(0, instr.rt, instr.imm);
        }
        Opcode::Nop => {
            fwd.id_fwd.clear(0);
        }
        Opcode::Beq | Opcode::Bne | Opcode::J | Opcode::Hlt | Opcode::Stop => {}
    }
    Ok(())
}

/// Runs EX2: publishes the arithmetic result one stage early (skipped by
/// `mult`/`multi`, whose result isn't ready yet), or the `li` schedule's
/// next step, or clears the `nop` bubble's owned rows.
pub fn ex2_stage(instr: &mut Instruction, fwd: &mut ForwardingBuffers) {
    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or => {
            fwd.id_fwd.fill(1, instr.rd, instr.result);
            fwd.ex_fwd.fill(0, instr.rd, instr.result);
        }
        Opcode::Addi | Opcode::Subi | Opcode::Andi | Opcode::Ori => {
            fwd.id_fwd.fill(1, instr.rt, instr.result);
            fwd.ex_fwd.fill(0, instr.rt, instr.result);
        }
        Opcode::Mult | Opcode::Multi => {}
        Opcode::Li => {
            fwd.id_fwd.fill(1, instr.rt, instr.imm);
            fwd.ex_fwd.fill(0, instr.rt, instr.imm);
        }
        Opcode::Nop => {
            fwd.id_fwd.clear(1);
            fwd.ex_fwd.clear(0);
        }
        Opcode::Lw | Opcode::Sw | Opcode::Beq | Opcode::Bne | Opcode::J | Opcode::Hlt | Opcode::Stop => {}
    }
}

/// Runs EX3: publishes the result into the next forwarding row and records
/// the combined EX-stage timestamp (full-timestamp instructions only).
pub fn ex3_stage(instr: &mut Instruction, fwd: &mut ForwardingBuffers, clock: u64) {
    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Mult => {
            fwd.id_fwd.fill(2, instr.rd, instr.result);
            fwd.ex_fwd.fill(1, instr.rd, instr.result);
        }
        Opcode::Addi | Opcode::Subi | Opcode::Andi | Opcode::Ori | Opcode::Multi => {
            fwd.id_fwd.fill(2, instr.rt, instr.result);
            fwd.ex_fwd.fill(1, instr.rt, instr.result);
        }
        Opcode::Li => {
            fwd.id_fwd.fill(2, instr.rt, instr.imm);
            fwd.ex_fwd.fill(1, instr.rt, instr.imm);
        }
        Opcode::Nop => {
            fwd.id_fwd.clear(2);
            fwd.ex_fwd.clear(1);
        }
        Opcode::Lw | Opcode::Sw | Opcode::Beq | Opcode::Bne | Opcode::J | Opcode::Hlt | Opcode::Stop => {}
    }
    if instr.opcode.emits_full_timestamps() {
        instr.record_timestamp(Stage::Ex, clock);
    }
}

/// Runs MEM: publishes the final forwarding row, performs the actual data
/// access for `lw`/`sw`, and records the MEM-exit timestamp.
pub fn mem_stage(
    instr: &mut Instruction,
    fwd: &mut ForwardingBuffers,
    mem: &mut MemoryArbiter,
    clock: u64,
) -> Result<Control, PipelineError> {
    match instr.opcode {
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Mult => {
            fwd.id_fwd.fill(3, instr.rd, instr.result);
            fwd.ex_fwd.fill(2, instr.rd, instr.result);
            fwd.da_fwd.fill(0, instr.rd, instr.result);
        }
        Opcode::Addi | Opcode::Subi | Opcode::Andi | Opcode::Ori | Opcode::Multi => {
            fwd.id_fwd.fill(3, instr.rt, instr.result);
            fwd.ex_fwd.fill(2, instr.rt, instr.result);
            fwd.da_fwd.fill(0, instr.rt, instr.result);
        }
        Opcode::Li => {
            fwd.id_fwd.fill(3, instr.rt, instr.imm);
            fwd.ex_fwd.fill(2, instr.rt, instr.imm);
            fwd.da_fwd.fill(0, instr.rt, instr.imm);
        }
        Opcode::Lw => {
            if let Some(v) = fwd.da_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            let address = instr.result as u32;
            let loaded = match mem.fetch_data(address) {
                MemOutcome::Ready(value) => value,
                MemOutcome::Stall(stage) => return Ok(Control::Stall(stage)),
            };
            instr.result = loaded;
            fwd.id_fwd.fill(3, instr.rs, loaded);
            fwd.ex_fwd.fill(2, instr.rs, loaded);
            fwd.da_fwd.fill(0, instr.rs, loaded);
        }
        Opcode::Sw => {
            if let Some(v) = fwd.da_fwd.forward(instr.rs) {
                instr.op1 = v;
            }
            let address = instr.result as u32;
            match mem.write_word(instr.op1, address) {
                MemOutcome::Ready(()) => {}
                MemOutcome::Stall(stage) => return Ok(Control::Stall(stage)),
            }
        }
        Opcode::Nop => {
            fwd.id_fwd.clear(3);
            fwd.ex_fwd.clear(2);
            fwd.da_fwd.clear(0);
        }
        Opcode::Beq | Opcode::Bne | Opcode::J | Opcode::Hlt | Opcode::Stop => {}
    }
    if instr.opcode.emits_full_timestamps() {
        instr.record_timestamp(Stage::Mem, clock);
    }
    Ok(Control::Continue)
}

/// Runs WB: commits the result to the register file (for variants that
/// have one) and records the WB-exit timestamp.
pub fn wb_stage(instr: &mut Instruction, regs: &mut RegisterFile, clock: u64) {
    match instr.opcode {
        Opcode::Li => regs.write(instr.rt, instr.imm),
        Opcode::Lw => regs.write(instr.rs, instr.result),
        _ => {
            if let Some(dest) = hazard::destination_register(instr) {
                regs.write(dest, instr.result);
            }
        }
    }
    if instr.opcode.emits_full_timestamps() {
        instr.record_timestamp(Stage::Wb, clock);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn idle_window<'a>(blank: &'a Instruction) -> HazardWindow<'a> {
        HazardWindow { ex1: blank, ex2: blank, ex3: blank, mem: blank }
    }

    #[test]
    fn id_stage_computes_operands_from_the_register_file() {
        let mut regs = RegisterFile::new();
        regs.write(1, 3);
        regs.write(2, 4);
        let mut fwd = ForwardingBuffers::new();
        let blank = Instruction::nop();
        let mut pc = 0;
        let mut instr = Instruction::r_type(Opcode::Add, 3, 1, 2, String::new());
        let control = id_stage(&mut instr, &regs, &mut fwd, idle_window(&blank), &mut pc, 1);
        assert_eq!(control, Control::Continue);
        assert_eq!(instr.op1, 3);
        assert_eq!(instr.op2, 4);
    }

    #[test]
    fn id_stage_prefers_forwarded_value_over_register_file() {
        let regs = RegisterFile::new();
        let mut fwd = ForwardingBuffers::new();
        fwd.id_fwd.fill(0, 1, 99);
        let blank = Instruction::nop();
        let mut pc = 0;
        let mut instr = Instruction::i_type(Opcode::Addi, 3, 1, 5, String::new()).unwrap();
        id_stage(&mut instr, &regs, &mut fwd, idle_window(&blank), &mut pc, 1);
        assert_eq!(instr.op1, 99);
    }

    #[test]
    fn id_stage_stalls_on_load_use_hazard() {
        let regs = RegisterFile::new();
        let mut fwd = ForwardingBuffers::new();
        let lw = Instruction::memory(Opcode::Lw, 9, 2, 0, String::new()).unwrap();
        let blank = Instruction::nop();
        let window = HazardWindow { ex1: &lw, ex2: &blank, ex3: &blank, mem: &blank };
        let mut pc = 0;
        let mut instr = Instruction::r_type(Opcode::Add, 3, 9, 1, String::new());
        let control = id_stage(&mut instr, &regs, &mut fwd, window, &mut pc, 1);
        assert_eq!(control, Control::Stall(Stage::Id));
    }

    #[test]
    fn id_stage_flushes_and_sets_pc_on_taken_branch() {
        let mut regs = RegisterFile::new();
        regs.write(1, 5);
        regs.write(2, 5);
        let mut fwd = ForwardingBuffers::new();
        let blank = Instruction::nop();
        let mut pc = 0;
        let mut instr = Instruction::branch(Opcode::Beq, 1, 2, 10, String::new());
        let control = id_stage(&mut instr, &regs, &mut fwd, idle_window(&blank), &mut pc, 1);
        assert_eq!(control, Control::Flush);
        assert_eq!(pc, 10 * 4 - 4);
    }

    #[test]
    fn id_stage_does_not_flush_on_untaken_branch() {
        let mut regs = RegisterFile::new();
        regs.write(1, 5);
        regs.write(2, 6);
        let mut fwd = ForwardingBuffers::new();
        let blank = Instruction::nop();
        let mut pc = 0;
        let mut instr = Instruction::branch(Opcode::Beq, 1, 2, 10, String::new());
        let control = id_stage(&mut instr, &regs, &mut fwd, idle_window(&blank), &mut pc, 1);
        assert_eq!(control, Control::Continue);
    }

    #[test]
    fn ex1_stage_rejects_unaligned_memory_address() {
        let mut fwd = ForwardingBuffers::new();
        let mut instr = Instruction::memory(Opcode::Lw, 1, 2, 1, String::new()).unwrap();
        instr.op2 = 0;
        let err = ex1_stage(&mut instr, &mut fwd).unwrap_err();
        assert!(matches!(err, PipelineError::UnalignedAddress(1)));
    }

    #[test]
    fn ex1_stage_computes_arithmetic_result() {
        let mut fwd = ForwardingBuffers::new();
        let mut instr = Instruction::r_type(Opcode::Sub, 3, 1, 2, String::new());
        instr.op1 = 10;
        instr.op2 = 4;
        ex1_stage(&mut instr, &mut fwd).unwrap();
        assert_eq!(instr.result, 6);
    }

    #[test]
    fn ex2_stage_publishes_add_result_to_both_forwarding_tables() {
        let mut fwd = ForwardingBuffers::new();
        let mut instr = Instruction::r_type(Opcode::Add, 3, 1, 2, String::new());
        instr.result = 42;
        ex2_stage(&mut instr, &mut fwd);
        assert_eq!(fwd.id_fwd.forward(3), Some(42));
        assert_eq!(fwd.ex_fwd.forward(3), Some(42));
    }

    #[test]
    fn ex2_stage_does_not_publish_a_multiply_result_early() {
        let mut fwd = ForwardingBuffers::new();
        let mut instr = Instruction::r_type(Opcode::Mult, 3, 1, 2, String::new());
        instr.result = 42;
        ex2_stage(&mut instr, &mut fwd);
        assert_eq!(fwd.id_fwd.forward(3), None);
    }

    #[test]
    fn mem_stage_records_timestamp_only_for_full_timestamp_opcodes() {
        let mut fwd = ForwardingBuffers::new();
        let mut mem = MemoryArbiter::new([Instruction::hlt("hlt".into())], []);
        let mut instr = Instruction::branch(Opcode::Beq, 1, 2, 0, String::new());
        mem_stage(&mut instr, &mut fwd, &mut mem, 7).unwrap();
        assert_eq!(instr.timestamp(Stage::Mem), 0);

        let mut add = Instruction::r_type(Opcode::Add, 3, 1, 2, String::new());
        mem_stage(&mut add, &mut fwd, &mut mem, 7).unwrap();
        assert_eq!(add.timestamp(Stage::Mem), 7);
    }

    #[test]
    fn wb_stage_writes_li_into_rt_and_lw_into_rs() {
        let mut regs = RegisterFile::new();
        let mut li = Instruction::li(4, 11, String::new()).unwrap();
        wb_stage(&mut li, &mut regs, 1);
        assert_eq!(regs.read(4), 11);

        let mut lw = Instruction::memory(Opcode::Lw, 5, 2, 0, String::new()).unwrap();
        lw.result = 77;
        wb_stage(&mut lw, &mut regs, 1);
        assert_eq!(regs.read(5), 77);
    }
}
