//! CLI tool to run pipeline (.pipe) files through the lazy engine.
//!
//! Usage:
//!   pipe-run <pipeline.pipe>
//!   pipe-run <pipeline.pipe> -o <output.data>
//!
//! If no output file is specified, writes to stdout. Set `RUST_LOG=debug`
//! (or pass `-v`) to see every fetch on stderr.

use clap::Parser;
use pull_pipes::{LogSink, execute};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// Run a pipeline file and print what its terminal produced.
#[derive(Parser)]
#[command(name = "pipe-run")]
struct Cli {
    /// Pipeline definition file (.pipe)
    pipeline: String,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Log every fetch on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let pipeline_text = match fs::read_to_string(&cli.pipeline) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading pipeline file '{}': {e}", cli.pipeline);
            process::exit(1);
        }
    };

    let outcome = match execute(&pipeline_text, Rc::new(LogSink)) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    };

    let output = outcome.to_string();
    if let Some(out_path) = &cli.output {
        if let Some(parent) = Path::new(out_path.as_str()).parent()
            && !parent.as_os_str().is_empty()
            && fs::create_dir_all(parent).is_err()
        {
            eprintln!("Error creating output directory for '{out_path}'");
            process::exit(1);
        }
        if let Err(e) = fs::write(out_path, &output) {
            eprintln!("Error writing output file '{out_path}': {e}");
            process::exit(1);
        }
    } else {
        if let Err(e) = io::stdout().write_all(output.as_bytes()) {
            eprintln!("Error writing output: {e}");
            process::exit(1);
        }
        if !output.is_empty() && !output.ends_with('\n') {
            println!();
        }
    }
    tracing::info!(lines = outcome.len(), "pipeline complete");
}
