use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use log::info;

use super::target;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration with sampler settings and the `target` components.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let mut file = target::load(&args.config)?;
    file.run.output.run_directory = Some(args.out.clone());
    let (store, well) = target::build(&file.target)?;

    let summary = hmc_sampler::run(&file.run, store, well)?;
    fs::write(
        args.out.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    // Keep the input next to the artefacts so the run can be resumed.
    fs::copy(&args.config, args.out.join("config.yaml"))?;
    info!(
        "{} steps, acceptance {:.3}, summary in {}",
        summary.steps,
        summary.acceptance_rate,
        args.out.display()
    );
    Ok(())
}
