//! pushgp CLI - evolve Push programs on built-in problems and run saved ones.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// pushgp - program synthesis with PushGP
#[derive(Parser, Debug)]
#[command(name = "pushgp")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve a program for a built-in problem
    Evolve(cli::evolve::EvolveArgs),

    /// Run a saved program on JSON inputs
    Exec {
        /// Program file written by `evolve --output`
        #[arg(required = true)]
        program: PathBuf,

        /// Inputs as a JSON array of tagged values, e.g. '[{"type":"int","value":3}]'
        #[arg(short, long, default_value = "[]")]
        inputs: String,

        /// Print the final interpreter state as JSON
        #[arg(long)]
        trace: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Evolve(evolve) => cli::evolve::execute(evolve),
        Commands::Exec {
            program,
            inputs,
            trace,
        } => cli::exec::execute(&program, &inputs, trace),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
