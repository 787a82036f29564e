use std::path::{Path, PathBuf};

use hmc_core::{AttributeStore, HmcError, ScoringFunction};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::accessor::OptimizedVariables;
use crate::analysis::TraceSummary;
use crate::checkpoint::{self, CheckpointPayload, KeyedValue};
use crate::config::{OutputConfig, RunConfig};
use crate::determinism;
use crate::manifest::{self, RunManifest, ARTIFACT_SCHEMA};
use crate::sampler::HamiltonianMonteCarlo;
use crate::stats::StatisticsAccumulator;
use crate::trace::TraceRecorder;

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Monte Carlo steps completed by this invocation.
    pub steps: usize,
    /// Fraction of this invocation's steps that accepted their trajectory.
    pub acceptance_rate: f64,
    /// Mean of every per-step statistic over the recorded samples.
    pub stats: IndexMap<String, f64>,
    /// Total energy of the final state.
    pub final_total_energy: f64,
    /// Managed coordinates at the end of the run.
    pub final_positions: Vec<KeyedValue>,
    /// Per-variable summary of the recorded trace.
    pub trace_summary: TraceSummary,
    /// Trace CSV, if written.
    pub trace_path: Option<PathBuf>,
    /// Statistics CSV, if written.
    pub stats_path: Option<PathBuf>,
    /// Manifest path, if written.
    pub manifest_path: Option<PathBuf>,
    /// Checkpoint files retained at the end of the run.
    pub checkpoints: Vec<PathBuf>,
}

/// Samples the optimized variables of `store` from scratch.
pub fn run<S, F>(config: &RunConfig, store: S, scoring: F) -> Result<RunSummary, HmcError>
where
    S: AttributeStore,
    F: ScoringFunction,
{
    config.validate()?;
    let sampler = HamiltonianMonteCarlo::new(store, scoring, &config.sampler)?;
    run_from(config, config.seed_policy.master_seed, sampler)
}

/// Resumes a run from a checkpoint written by [`run`].
///
/// `store` must hold the same entities the checkpointed run sampled; positions,
/// velocities and the persistence counter are overwritten from the payload.
pub fn resume<S, F>(path: &Path, store: S, scoring: F) -> Result<RunSummary, HmcError>
where
    S: AttributeStore,
    F: ScoringFunction,
{
    resume_in(path, None, store, scoring)
}

/// Like [`resume`], writing artefacts under `run_directory` instead of the
/// checkpointed run's directory when one is given.
pub fn resume_in<S, F>(
    path: &Path,
    run_directory: Option<&Path>,
    store: S,
    scoring: F,
) -> Result<RunSummary, HmcError>
where
    S: AttributeStore,
    F: ScoringFunction,
{
    let mut payload = CheckpointPayload::load(path)?;
    if let Some(dir) = run_directory {
        payload.config.output.run_directory = Some(dir.to_path_buf());
    }
    let config = &payload.config;
    config.validate()?;
    let mut sampler = HamiltonianMonteCarlo::new(store, scoring, &config.sampler)?;
    payload.apply_to(sampler.store_mut())?;
    sampler.set_persistence_counter(payload.persistence_counter)?;
    sampler.set_steps_taken(payload.step.min(config.total_steps()));
    info!(
        "resuming {} at step {} of {}",
        path.display(),
        sampler.steps_taken(),
        config.total_steps()
    );
    run_from(config, payload.master_seed, sampler)
}

fn run_from<S, F>(
    config: &RunConfig,
    seed: u64,
    mut sampler: HamiltonianMonteCarlo<S, F>,
) -> Result<RunSummary, HmcError>
where
    S: AttributeStore,
    F: ScoringFunction,
{
    let variables = OptimizedVariables::new(sampler.store())?.into_interface();
    let mut trace = TraceRecorder::new(variables, sampler.store());
    let mut stats = StatisticsAccumulator::new();
    let mut checkpoints = Vec::new();
    let run_dir = config.output.run_directory.clone();

    let first = sampler.steps_taken();
    let total = config.total_steps();
    let mut accepted = 0usize;
    for step in first..total {
        let mut rng = determinism::step_rng(seed, step);
        let outcome = sampler.do_step(&mut rng)?;
        if outcome.accepted {
            accepted += 1;
        }
        if step >= config.burn_in && (step - config.burn_in) % config.thinning == 0 {
            trace.record(step, sampler.store())?;
            stats.add_sample(step, &outcome);
        }

        let completed = step + 1;
        if let Some(dir) = &run_dir {
            if config.checkpoint.interval > 0 && completed % config.checkpoint.interval == 0 {
                let path = write_checkpoint(config, seed, completed, &sampler, dir)?;
                checkpoints.push(path);
                enforce_checkpoint_retention(&mut checkpoints, config.checkpoint.max_to_keep)?;
            }
        }
    }

    let steps = total.saturating_sub(first);
    let acceptance_rate = if steps == 0 {
        0.0
    } else {
        accepted as f64 / steps as f64
    };
    if steps > 0 && accepted == 0 {
        warn!("no trajectory accepted in {steps} steps; consider a smaller timestep");
    }
    let final_total_energy = sampler.get_total_energy()?;
    let final_positions = sampler
        .md()
        .positions()
        .pairs()
        .map(|(key, entity)| {
            Ok(KeyedValue {
                key,
                entity,
                value: sampler.store().get_value(key, entity)?,
            })
        })
        .collect::<Result<Vec<_>, HmcError>>()?;
    let trace_summary = TraceSummary::from_rows(trace.names(), trace.values());

    let (trace_path, stats_path, manifest_path) = match &run_dir {
        Some(dir) => {
            let trace_path = write_csv(&dir.join(&config.output.trace_file), |path| {
                trace.write_csv(path)
            })?;
            let stats_path = write_csv(&dir.join(&config.output.stats_file), |path| {
                stats.write_csv(path)
            })?;
            let manifest = RunManifest {
                schema: ARTIFACT_SCHEMA,
                provenance: manifest::provenance(config, seed)?,
                config: config.clone(),
                seed_label: config.seed_policy.label.clone(),
                steps: total,
                acceptance_rate,
                final_total_energy,
                trace_file: Some(config.output.trace_file.clone()),
                stats_file: Some(config.output.stats_file.clone()),
                checkpoints: relative_to(&checkpoints, dir),
            };
            let manifest_path = dir.join(&config.output.manifest_file);
            manifest.write(&manifest_path)?;
            (Some(trace_path), Some(stats_path), Some(manifest_path))
        }
        None => (None, None, None),
    };

    info!(
        "completed steps {first}..{total} acceptance {acceptance_rate:.3} energy {final_total_energy}"
    );
    Ok(RunSummary {
        steps,
        acceptance_rate,
        stats: stats
            .mean_stats()
            .iter()
            .map(|(key, value)| (key.to_string(), *value))
            .collect(),
        final_total_energy,
        final_positions,
        trace_summary,
        trace_path,
        stats_path,
        manifest_path,
        checkpoints,
    })
}

fn write_checkpoint<S, F>(
    config: &RunConfig,
    seed: u64,
    completed: usize,
    sampler: &HamiltonianMonteCarlo<S, F>,
    run_dir: &Path,
) -> Result<PathBuf, HmcError>
where
    S: AttributeStore,
    F: ScoringFunction,
{
    let path = checkpoint::checkpoint_path(&checkpoint_dir(&config.output, run_dir), completed);
    let payload = checkpoint::build_payload(
        completed,
        sampler.persistence_counter(),
        config,
        seed,
        sampler.store(),
        sampler.md().positions(),
        sampler.md().velocities(),
    )?;
    payload.store(&path)?;
    Ok(path)
}

fn checkpoint_dir(output: &OutputConfig, run_dir: &Path) -> PathBuf {
    run_dir.join(&output.checkpoint_dir)
}

fn enforce_checkpoint_retention(
    paths: &mut Vec<PathBuf>,
    max_to_keep: usize,
) -> Result<(), HmcError> {
    while paths.len() > max_to_keep {
        let path = paths.remove(0);
        std::fs::remove_file(&path)
            .map_err(|err| HmcError::serde_at("checkpoint-remove", err, &path))?;
    }
    Ok(())
}

fn write_csv(
    path: &Path,
    write: impl FnOnce(&Path) -> Result<(), HmcError>,
) -> Result<PathBuf, HmcError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| HmcError::serde_at("output-mkdir", err, parent))?;
    }
    write(path)?;
    Ok(path.to_path_buf())
}

fn relative_to(paths: &[PathBuf], root: &Path) -> Vec<PathBuf> {
    paths
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}
