use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use hmc_sampler::{TraceSummary, TraceTable};

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Trace CSV produced by `hmc-sim run`.
    #[arg(long)]
    pub trace: PathBuf,
}

pub fn run(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let table = TraceTable::load(&args.trace)?;
    let summary = TraceSummary::from_rows(&table.names, &table.rows);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
