//! mpp CLI - markup-to-LaTeX preprocessor.
//!
//! Transforms tagged spans such as `(b text)` in a document into LaTeX
//! commands. Without an output path the input is rewritten in place after a
//! hidden backup copy (`.NAME~`) is written next to it.

mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::ProcessArgs;
use output::Output;

/// mpp - markup-to-LaTeX preprocessor.
#[derive(Parser)]
#[command(name = "mpp", version, about)]
struct Cli {
    #[command(flatten)]
    args: ProcessArgs,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.args.execute(&output) {
        output.error(&err);
        std::process::exit(1);
    }
}
