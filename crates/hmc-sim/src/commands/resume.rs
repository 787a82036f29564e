use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use log::info;

use super::target;

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Checkpoint JSON written by a previous run.
    #[arg(long)]
    pub checkpoint: PathBuf,
    /// Configuration describing the same target as the checkpointed run.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for the resumed run's artefacts.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &ResumeArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let file = target::load(&args.config)?;
    let (store, well) = target::build(&file.target)?;

    let summary = hmc_sampler::resume_in(&args.checkpoint, Some(&args.out), store, well)?;
    fs::write(
        args.out.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    info!(
        "resumed {} steps, acceptance {:.3}",
        summary.steps, summary.acceptance_rate
    );
    Ok(())
}
