//! CLI entry point: reads the instruction and data files, assembles them,
//! runs the pipeline engine to completion, and writes the output file.
//!
//! Takes the instruction file, data file, and output file as positional
//! arguments, plus an optional pipeline-dump flag, via `clap`.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sixstage_hw::PipelineEngine;
use sixstage_emu::errors::EmuError;
use sixstage_emu::output::OutputWriter;
use sixstage_emu::{driver, io};

/// Six-stage pipelined MIPS simulator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the assembly instruction file.
    inst_file: PathBuf,
    /// Path to the data file.
    data_file: PathBuf,
    /// Path to the output file to create.
    out_file: PathBuf,
    /// Log one pipeline-occupancy line per tick at `trace` level (set
    /// `RUST_LOG=sixstage_emu=trace` to see it).
    #[arg(short = 'p', long = "pipeline-dump")]
    pipeline_dump: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EmuError> {
    let program = io::read_program(&cli.inst_file)?;
    let data = io::read_data(&cli.data_file)?;

    tracing::info!(
        instructions = program.instructions.len(),
        data_words = data.len(),
        "assembled program"
    );

    let engine = PipelineEngine::new(program.instructions, data, cli.pipeline_dump);

    let file = File::create(&cli.out_file).map_err(|source| EmuError::WriteFile { path: cli.out_file.clone(), source })?;
    let mut writer = OutputWriter::new(file);

    driver::run(engine, &mut writer)?;
    Ok(())
}
