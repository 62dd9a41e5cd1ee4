//! The textual assembler: tokenizes source lines, resolves labels to
//! instruction indices, and parses the data file into signed words.
//!
//! This supplies the `instructions`/`symbol_table` and `data` inputs the
//! pipeline core consumes: one regex per opcode family, a two-pass label
//! resolution so forward references work, and the original line text
//! left-padded and carried straight into each [`Instruction`]'s `source`
//! field.

mod patterns;

use std::collections::HashMap;

use sixstage_hw::memory::{DATA_SEGMENT_BASE, RAM_WORDS};
use sixstage_isa::{Instruction, Opcode};

use crate::errors::AssembleError;

/// Maximum program length: 256 instruction words.
pub const MAX_PROGRAM_WORDS: usize = 256;

/// Maximum data-segment length: whatever RAM remains past the data
/// segment's byte offset, in words.
pub const MAX_DATA_WORDS: usize = RAM_WORDS - (DATA_SEGMENT_BASE as usize / 4);

/// The output of assembling an instruction file: the resolved instruction
/// list plus the `label -> instruction index` table it was resolved
/// against.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// The resolved instruction list, in program order.
    pub instructions: Vec<Instruction>,
    /// `label -> instruction index`, built during assembly.
    pub symbol_table: HashMap<String, usize>,
}

struct RawLine {
    /// The instruction index this line will occupy once resolved.
    index: usize,
    /// The original line as typed, comments and surrounding whitespace
    /// trimmed from the right only (so `padded_source` pads it to width).
    original: String,
    /// The instruction body — the line with any `label:` prefix and
    /// trailing comment stripped.
    body: String,
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Left-pads `original` to 35 characters, per the output-file line format.
fn padded_source(original: &str) -> String {
    format!("{original:>35}")
}

/// Assembles the textual contents of an instruction file into a
/// [`Program`].
///
/// Runs two passes. The first strips comments and `label:` prefixes to
/// build the symbol table — a label may prefix its instruction on the same
/// line, or stand alone on the line immediately before it — over the whole
/// file, so every label is known before any operand is resolved against it
/// (this is what makes forward branches work). The second resolves each
/// instruction's operands, including branch/jump targets, against that
/// table.
pub fn assemble_program(text: &str) -> Result<Program, AssembleError> {
    let mut lines = Vec::new();
    let mut symbol_table = HashMap::new();
    let mut pending_label: Option<String> = None;
    let mut index = 0usize;

    for raw in text.lines() {
        let stripped = strip_comment(raw).trim();
        if stripped.is_empty() {
            continue;
        }

        let (label, body) = match patterns::label().captures(stripped) {
            Some(caps) => (Some(caps["label"].to_owned()), caps["rest"].trim().to_owned()),
            None => (None, stripped.to_owned()),
        };

        if body.is_empty() {
            // A label on its own line: remember it for the next instruction.
            pending_label = label;
            continue;
        }

        if let Some(label) = label {
            symbol_table.insert(label, index);
        }
        if let Some(label) = pending_label.take() {
            symbol_table.insert(label, index);
        }

        lines.push(RawLine { index, original: raw.trim_end().to_owned(), body });
        index += 1;
    }

    if lines.len() > MAX_PROGRAM_WORDS {
        return Err(AssembleError::ProgramTooLong(lines.len()));
    }

    let mut instructions = Vec::with_capacity(lines.len());
    for line in &lines {
        instructions.push(assemble_line(line, &symbol_table)?);
    }

    Ok(Program { instructions, symbol_table })
}

fn resolve_label(symbol_table: &HashMap<String, usize>, label: &str, line: &RawLine) -> Result<i32, AssembleError> {
    symbol_table
        .get(label)
        .map(|&target| target as i32)
        .ok_or_else(|| AssembleError::UndefinedLabel { index: line.index, label: label.to_owned() })
}

fn parse_reg(text: &str, line: &RawLine) -> Result<u8, AssembleError> {
    text.parse::<u8>()
        .map_err(|_| AssembleError::UnrecognizedSyntax { index: line.index, text: line.original.clone() })
}

fn parse_imm(text: &str, line: &RawLine) -> Result<i32, AssembleError> {
    text.parse::<i32>()
        .map_err(|_| AssembleError::UnrecognizedSyntax { index: line.index, text: line.original.clone() })
}

fn assemble_line(line: &RawLine, symbol_table: &HashMap<String, usize>) -> Result<Instruction, AssembleError> {
    let body = line.body.as_str();
    let source = padded_source(&line.original);

    if let Some(caps) = patterns::r_type().captures(body) {
        let opcode = match &caps["op"] {
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "mult" => Opcode::Mult,
            _ => unreachable!("r_type regex only matches these mnemonics"),
        };
        let rd = parse_reg(&caps["rd"], line)?;
        let rs = parse_reg(&caps["rs"], line)?;
        let rt = parse_reg(&caps["rt"], line)?;
        return Ok(Instruction::r_type(opcode, rd, rs, rt, source));
    }

    if let Some(caps) = patterns::i_type().captures(body) {
        let opcode = match &caps["op"] {
            "addi" => Opcode::Addi,
            "subi" => Opcode::Subi,
            "andi" => Opcode::Andi,
            "ori" => Opcode::Ori,
            "multi" => Opcode::Multi,
            _ => unreachable!("i_type regex only matches these mnemonics"),
        };
        let rt = parse_reg(&caps["rt"], line)?;
        let rs = parse_reg(&caps["rs"], line)?;
        let imm = parse_imm(&caps["imm"], line)?;
        return Ok(Instruction::i_type(opcode, rt, rs, imm, source)?);
    }

    if let Some(caps) = patterns::memory().captures(body) {
        let opcode = match &caps["op"] {
            "lw" => Opcode::Lw,
            "sw" => Opcode::Sw,
            _ => unreachable!("memory regex only matches lw/sw"),
        };
        let rs = parse_reg(&caps["rs"], line)?;
        let rt = parse_reg(&caps["rt"], line)?;
        let imm = parse_imm(&caps["imm"], line)?;
        return Ok(Instruction::memory(opcode, rs, rt, imm, source)?);
    }

    if let Some(caps) = patterns::li().captures(body) {
        let rt = parse_reg(&caps["rt"], line)?;
        let imm = parse_imm(&caps["imm"], line)?;
        return Ok(Instruction::li(rt, imm, source)?);
    }

    if let Some(caps) = patterns::branch().captures(body) {
        let opcode = match &caps["op"] {
            "beq" => Opcode::Beq,
            "bne" => Opcode::Bne,
            _ => unreachable!("branch regex only matches beq/bne"),
        };
        let rs = parse_reg(&caps["rs"], line)?;
        let rt = parse_reg(&caps["rt"], line)?;
        let target = resolve_label(symbol_table, &caps["label"], line)?;
        return Ok(Instruction::branch(opcode, rs, rt, target, source));
    }

    if let Some(caps) = patterns::jump().captures(body) {
        let target = resolve_label(symbol_table, &caps["label"], line)?;
        return Ok(Instruction::jump(target, source));
    }

    if patterns::hlt().is_match(body) {
        return Ok(Instruction::hlt(source));
    }

    if patterns::nop().is_match(body) {
        // A user-authored `nop` never carries source text: only the
        // engine's internally synthesized flushed-branch filler does, and
        // that distinction is what `Instruction::output_line` uses to
        // decide whether a bubble is silent or prints its discarded text.
        return Ok(Instruction::nop());
    }

    Err(AssembleError::UnrecognizedSyntax { index: line.index, text: line.original.clone() })
}

/// Assembles the textual contents of a data file into signed words, placed
/// at RAM offset [`DATA_SEGMENT_BASE`] in load order.
///
/// Tokens are whitespace-separated and may span multiple lines; `#` starts
/// a line comment, matching the instruction file's convention.
pub fn assemble_data(text: &str) -> Result<Vec<i32>, AssembleError> {
    let mut data = Vec::new();
    for raw in text.lines() {
        let stripped = strip_comment(raw).trim();
        if stripped.is_empty() {
            continue;
        }
        for token in stripped.split_whitespace() {
            let value =
                token.parse::<i32>().map_err(|_| AssembleError::MalformedData { text: token.to_owned() })?;
            data.push(value);
        }
    }
    if data.len() > MAX_DATA_WORDS {
        return Err(AssembleError::DataTooLong(data.len(), MAX_DATA_WORDS));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_forward_branch_target() {
        let program = assemble_program(
            "li r1, 1\nli r2, 1\nbeq r1, r2, L\nli r3, 99\nL: li r3, 7\nhlt\n",
        )
        .unwrap();
        assert_eq!(program.symbol_table["L"], 4);
        assert_eq!(program.instructions[2].opcode, Opcode::Beq);
        assert_eq!(program.instructions[2].imm, 4);
    }

    #[test]
    fn resolves_label_on_its_own_line() {
        let program = assemble_program("j L\nnop\nL:\nhlt\n").unwrap();
        assert_eq!(program.symbol_table["L"], 2);
        assert_eq!(program.instructions[0].imm, 2);
    }

    #[test]
    fn undefined_label_is_an_error() {
        let err = assemble_program("j missing\nhlt\n").unwrap_err();
        assert!(matches!(err, AssembleError::UndefinedLabel { index: 0, .. }));
    }

    #[test]
    fn unrecognized_syntax_is_an_error() {
        let err = assemble_program("frobnicate r1, r2\nhlt\n").unwrap_err();
        assert!(matches!(err, AssembleError::UnrecognizedSyntax { index: 0, .. }));
    }

    #[test]
    fn immediate_out_of_range_is_an_error() {
        let err = assemble_program("li r1, 40000\nhlt\n").unwrap_err();
        assert!(matches!(err, AssembleError::Isa(sixstage_isa::IsaError::ImmediateOutOfRange(40000))));
    }

    #[test]
    fn memory_destination_is_first_register() {
        let program = assemble_program("lw r1, 0(r2)\nhlt\n").unwrap();
        assert_eq!(program.instructions[0].rs, 1);
        assert_eq!(program.instructions[0].rt, 2);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let program = assemble_program("# a comment\n\nli r1, 1 # trailing\nhlt\n").unwrap();
        assert_eq!(program.instructions.len(), 2);
    }

    #[test]
    fn source_is_left_padded_to_35_columns() {
        let program = assemble_program("hlt\n").unwrap();
        assert_eq!(program.instructions[0].source.len(), 35);
        assert!(program.instructions[0].source.ends_with("hlt"));
    }

    #[test]
    fn explicit_nop_carries_no_source_text() {
        let program = assemble_program("nop\nhlt\n").unwrap();
        assert!(program.instructions[0].source.is_empty());
        assert!(!program.instructions[0].is_flushed_filler());
    }

    #[test]
    fn data_file_parses_whitespace_separated_words() {
        let data = assemble_data("7\n-3 12\n# comment\n").unwrap();
        assert_eq!(data, vec![7, -3, 12]);
    }

    #[test]
    fn malformed_data_word_is_an_error() {
        let err = assemble_data("7\nnotanumber\n").unwrap_err();
        assert!(matches!(err, AssembleError::MalformedData { .. }));
    }

    #[test]
    fn program_length_limit_is_enforced() {
        let body = "hlt\n".repeat(MAX_PROGRAM_WORDS + 1);
        let err = assemble_program(&body).unwrap_err();
        assert!(matches!(err, AssembleError::ProgramTooLong(n) if n == MAX_PROGRAM_WORDS + 1));
    }
}
