use clap::Parser;

mod binaries;
mod blastdbcmd;
mod cli;
mod config;
mod error;
mod foldseek;
mod pipeline;
mod runner;
mod sequences;
mod tblastn;

use anyhow::{Context, Result};
use cli::Cli;
use env_logger::Env;
use runner::SystemRunner;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Parse CLI arguments; PATH is only consulted here.
    let args = Cli::parse();
    let config = args.into_config(std::env::var_os("PATH"));

    // Run every stage from the entry point implied by the input suffix.
    let report = pipeline::run_pipeline(&config, &mut SystemRunner)
        .with_context(|| format!("plaseek failed on {}", config.input.display()))?;

    println!("{} seconds.", report.tblastn_duration.as_secs_f64());
    log::info!(
        "{} structural hits, {} unique sequences, {} tblastn hits, {} accessions -> {}",
        report.structural_hits,
        report.unique_sequences,
        report.translated_hits,
        report.accessions,
        report.paths.outfile.display()
    );
    Ok(())
}
