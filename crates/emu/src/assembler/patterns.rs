//! Compiled regex patterns for the textual assembler, one per opcode
//! family.

use std::sync::OnceLock;

use regex::Regex;

macro_rules! pattern_fn {
    ($name:ident, $pattern:literal) => {
        pub(super) fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| Regex::new($pattern).expect("static regex pattern is valid"))
        }
    };
}

pattern_fn!(label, r"^(?P<label>[A-Za-z_]\w*):\s*(?P<rest>.*)$");

// `add rd, rs, rt` (and sub/and/or/mult)
pattern_fn!(r_type, r"^(?P<op>add|sub|and|or|mult)\s+r(?P<rd>\d+)\s*,\s*r(?P<rs>\d+)\s*,\s*r(?P<rt>\d+)$");

// `addi rt, rs, imm` (and subi/andi/ori/multi)
pattern_fn!(
    i_type,
    r"^(?P<op>addi|subi|andi|ori|multi)\s+r(?P<rt>\d+)\s*,\s*r(?P<rs>\d+)\s*,\s*(?P<imm>-?\d+)$"
);

// `lw rs, imm(rt)` (and sw) — destination/source register is first; see
// `Instruction` docs.
pattern_fn!(memory, r"^(?P<op>lw|sw)\s+r(?P<rs>\d+)\s*,\s*(?P<imm>-?\d+)\(r(?P<rt>\d+)\)$");

// `li rt, imm`
pattern_fn!(li, r"^li\s+r(?P<rt>\d+)\s*,\s*(?P<imm>-?\d+)$");

// `beq rs, rt, label` (and bne)
pattern_fn!(branch, r"^(?P<op>beq|bne)\s+r(?P<rs>\d+)\s*,\s*r(?P<rt>\d+)\s*,\s*(?P<label>[A-Za-z_]\w*)$");

// `j label`
pattern_fn!(jump, r"^j\s+(?P<label>[A-Za-z_]\w*)$");

pattern_fn!(hlt, r"^hlt$");
pattern_fn!(nop, r"^nop$");
