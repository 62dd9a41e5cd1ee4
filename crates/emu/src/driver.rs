//! The driver loop: ticks the pipeline engine, drains its output, and logs
//! stall/flush/termination events via `tracing`.

use std::io::Write;

use sixstage_hw::{PipelineEngine, PipelineError};

use crate::errors::EmuError;
use crate::output::OutputWriter;

/// Runs `engine` to completion, writing every retiring instruction's
/// output line to `writer` and the final cache-statistics footer once it
/// terminates.
///
/// A [`PipelineError::MissingHalt`] is not treated as fatal here: a
/// missing trailing `hlt` manifests as an attempt to execute a
/// non-instruction word, which is reported as a diagnostic to stderr
/// rather than propagated, and the simulation terminates as if it had
/// reached `stop`. Every other
/// [`PipelineError`] (an unaligned effective address, an out-of-bounds
/// access) is fatal and propagates to the caller.
///
/// Returns the final engine so callers (tests, in particular) can inspect
/// register state and cache statistics after termination.
pub fn run<W: Write>(
    mut engine: PipelineEngine,
    writer: &mut OutputWriter<W>,
) -> Result<PipelineEngine, EmuError> {
    loop {
        let report = match engine.tick() {
            Ok(report) => report,
            Err(PipelineError::MissingHalt(address)) => {
                tracing::warn!(address = format!("{address:#x}"), "forget to add HLT?");
                eprintln!("forget to add HLT? attempted to execute a non-instruction word at {address:#x}");
                write_footer(&engine, writer)?;
                return Ok(engine);
            }
            Err(err) => return Err(EmuError::Pipeline(err)),
        };

        if let Some(dump) = &report.dump_line {
            tracing::trace!(clock = report.clock, pipeline = %dump, "tick");
        }
        if let Some(line) = &report.output_line {
            tracing::debug!(clock = report.clock, %line, "instruction retired");
            writer.write_instruction(line).map_err(writer_io_error)?;
        }
        if report.done {
            tracing::info!(
                clock = report.clock,
                i_requests = engine.i_cache_requests(),
                i_hits = engine.i_cache_hits(),
                d_requests = engine.d_cache_requests(),
                d_hits = engine.d_cache_hits(),
                "simulation terminated"
            );
            write_footer(&engine, writer)?;
            return Ok(engine);
        }
    }
}

fn write_footer<W: Write>(engine: &PipelineEngine, writer: &mut OutputWriter<W>) -> Result<(), EmuError> {
    writer
        .write_stats(
            engine.i_cache_requests(),
            engine.i_cache_hits(),
            engine.d_cache_requests(),
            engine.d_cache_hits(),
        )
        .map_err(writer_io_error)
}

fn writer_io_error(source: std::io::Error) -> EmuError {
    EmuError::WriteFile { path: std::path::PathBuf::from("<output>"), source }
}
