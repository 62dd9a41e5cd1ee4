//! The output-file writer: per-instruction retirement lines plus the final
//! cache-statistics footer.

use std::io::{self, Write};

/// Writes the simulator's output file: one line per retiring instruction
/// that emits one, followed by the cache-statistics footer once the
/// simulation terminates.
#[derive(Debug)]
pub struct OutputWriter<W> {
    sink: W,
}

impl<W: Write> OutputWriter<W> {
    /// Wraps `sink` (typically a [`std::fs::File`]) as an output writer.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes one retiring instruction's already-formatted output line.
    ///
    /// [`sixstage_isa::Instruction::output_line`] produces the line body;
    /// this just appends the trailing newline the output format requires.
    pub fn write_instruction(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.sink, "{line}")
    }

    /// Writes the final cache-statistics footer after termination.
    pub fn write_stats(&mut self, i_requests: u64, i_hits: u64, d_requests: u64, d_hits: u64) -> io::Result<()> {
        write!(
            self.sink,
            "\nTotal number of access requests for instruction cache: {i_requests}\n\
             Number of instruction cache hits: {i_hits}\n\n\
             Total number of access requests for data cache: {d_requests}\n\
             Number of data cache hits: {d_hits}\n"
        )
    }

    /// Borrows the underlying sink, for tests that inspect buffered output.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_matches_exact_format() {
        let mut writer = OutputWriter::new(Vec::new());
        writer.write_stats(3, 2, 1, 0).unwrap();
        let text = String::from_utf8(writer.get_ref().clone()).unwrap();
        assert_eq!(
            text,
            "\nTotal number of access requests for instruction cache: 3\n\
             Number of instruction cache hits: 2\n\n\
             Total number of access requests for data cache: 1\n\
             Number of data cache hits: 0\n"
        );
    }

    #[test]
    fn instruction_line_gets_trailing_newline() {
        let mut writer = OutputWriter::new(Vec::new());
        writer.write_instruction("hlt 1 2 3 4 5").unwrap();
        assert_eq!(writer.get_ref(), b"hlt 1 2 3 4 5\n");
    }
}
