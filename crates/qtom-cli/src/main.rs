use std::error::Error;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

mod commands;
mod config;
mod io;

use commands::{process, state};

#[derive(Parser, Debug)]
#[command(name = "qtom", about = "Quantum tomography CLI: point estimates and fidelity confidence intervals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconstruct a quantum state from an input record.
    State(RunArgs),
    /// Reconstruct a quantum process from an input record.
    Process(RunArgs),
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    /// Path to the input data file.
    #[arg(short = 'i', long)]
    pub input: PathBuf,
    /// Path to the output file; prints to standard output when omitted.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
    /// Skip confidence-interval computation, reporting the point estimate
    /// only.
    #[arg(long)]
    pub no_ci: bool,
    /// Optional YAML configuration selecting the interval method and its
    /// parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::State(args) => state::run(&args),
        Command::Process(args) => process::run(&args),
    }
}
