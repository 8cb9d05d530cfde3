//! CLI tool to run a pipeline (.pipe) file and print every fetch.

use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use trace_pipe::execute_traced;
use tracing_subscriber::EnvFilter;

/// Run a pipeline file, printing the nested fetch sequence it triggers.
///
/// The trace goes to stdout, one line per notification, indented by node
/// depth. The outcome follows the trace, or goes to the output file.
#[derive(Parser)]
#[command(name = "pipe-trace")]
struct Cli {
    /// Pipeline definition file (.pipe)
    pipeline: String,

    /// Write the outcome to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Print only the outcome, not the trace
    #[arg(short, long)]
    quiet: bool,

    /// Show paths, event counts and debug logs on stderr
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

    if cli.verbose {
        eprintln!("Pipeline: {}", cli.pipeline);
        eprintln!("Output:   {}", cli.output.as_deref().unwrap_or("(stdout)"));
    }

    let (outcome, trace) = match execute_traced(&pipeline_text) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    if !cli.quiet && let Err(e) = write!(stdout, "{trace}") {
        eprintln!("Error writing trace: {e}");
        process::exit(1);
    }

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
    } else if !output.is_empty()
        && let Err(e) = writeln!(stdout, "{output}")
    {
        eprintln!("Error writing output: {e}");
        process::exit(1);
    }

    if cli.verbose {
        eprintln!(
            "Events:   {} registered, {} fetches",
            trace.registered().len(),
            trace
                .events
                .iter()
                .filter(|e| matches!(e, trace_pipe::FetchEvent::BeforeFetch { .. }))
                .count()
        );
    }
}
