use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    resume::{self, ResumeArgs},
    run::{self, RunArgs},
    summarize::{self, SummarizeArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "hmc-sim", about = "Hamiltonian Monte Carlo sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample a Gaussian target described in a YAML configuration.
    Run(RunArgs),
    /// Continue a run from one of its checkpoints.
    Resume(ResumeArgs),
    /// Print per-variable statistics of a trace CSV.
    Summarize(SummarizeArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Resume(args) => resume::run(&args),
        Command::Summarize(args) => summarize::run(&args),
    }
}
