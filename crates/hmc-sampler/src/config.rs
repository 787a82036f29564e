use std::fs;
use std::path::{Path, PathBuf};

use hmc_core::errors::ErrorInfo;
use hmc_core::HmcError;
use serde::{Deserialize, Serialize};

use crate::units::UnitSystem;

/// Parameters of a single Hamiltonian Monte Carlo sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmcConfig {
    /// Temperature scale in the energy units of the potential.
    #[serde(default = "default_kt")]
    pub kt: f64,
    /// Integrator steps per Monte Carlo step.
    #[serde(default = "default_md_steps")]
    pub number_of_md_steps: usize,
    /// Integrator step size.
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    /// Monte Carlo steps between momentum refreshes.
    #[serde(default = "default_persistence")]
    pub persistence: usize,
    /// Physical constants used for kinetic energy and velocity draws.
    #[serde(default)]
    pub units: UnitSystem,
    /// Whether the driver scores incrementally (unsupported, rejected on evaluation).
    #[serde(default)]
    pub incremental_scoring: bool,
}

fn default_kt() -> f64 {
    1.0
}

fn default_md_steps() -> usize {
    100
}

fn default_timestep() -> f64 {
    1.0
}

fn default_persistence() -> usize {
    1
}

impl Default for HmcConfig {
    fn default() -> Self {
        Self {
            kt: default_kt(),
            number_of_md_steps: default_md_steps(),
            timestep: default_timestep(),
            persistence: default_persistence(),
            units: UnitSystem::default(),
            incremental_scoring: false,
        }
    }
}

impl HmcConfig {
    /// Checks every field against the sampler's preconditions.
    pub fn validate(&self) -> Result<(), HmcError> {
        if self.number_of_md_steps == 0 {
            return Err(invalid("number_of_md_steps", "nsteps must be positive"));
        }
        if self.persistence == 0 {
            return Err(invalid("persistence", "persistence must be at least one"));
        }
        if !(self.kt.is_finite() && self.kt > 0.0) {
            return Err(invalid("kt", "kT must be finite and strictly positive"));
        }
        if !(self.timestep.is_finite() && self.timestep >= 0.0) {
            return Err(invalid("timestep", "timestep must be finite and non-negative"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> HmcError {
    HmcError::Precondition(ErrorInfo::new("invalid-config", message).with_context("field", field))
}

/// YAML-configurable parameters governing a complete sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Sampler parameters.
    #[serde(default)]
    pub sampler: HmcConfig,
    /// Number of recorded Monte Carlo steps (post burn-in).
    #[serde(default = "default_mc_steps")]
    pub mc_steps: usize,
    /// Number of initial steps excluded from traces and statistics.
    #[serde(default)]
    pub burn_in: usize,
    /// Interval at which to record samples.
    #[serde(default = "default_thinning")]
    pub thinning: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_mc_steps() -> usize {
    1000
}

fn default_thinning() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sampler: HmcConfig::default(),
            mc_steps: default_mc_steps(),
            burn_in: 0,
            thinning: default_thinning(),
            seed_policy: SeedPolicy::default(),
            checkpoint: CheckpointConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, HmcError> {
        let contents =
            fs::read_to_string(path).map_err(|err| HmcError::serde_at("config-read", err, path))?;
        Self::from_yaml(&contents).map_err(|err| match err {
            HmcError::Serde(info) => {
                HmcError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Parses and validates a configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, HmcError> {
        let config: RunConfig = serde_yaml::from_str(contents)
            .map_err(|err| HmcError::Serde(ErrorInfo::new("config-parse", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Total number of Monte Carlo steps including burn-in.
    pub fn total_steps(&self) -> usize {
        self.burn_in + self.mc_steps
    }

    /// Checks run-level and sampler-level preconditions.
    pub fn validate(&self) -> Result<(), HmcError> {
        self.sampler.validate()?;
        if self.thinning == 0 {
            return Err(invalid("thinning", "thinning must be at least one"));
        }
        Ok(())
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Interval in Monte Carlo steps between checkpoint writes (0 disables checkpoints).
    #[serde(default)]
    pub interval: usize,
    /// Maximum number of checkpoints to retain.
    #[serde(default = "default_checkpoint_retention")]
    pub max_to_keep: usize,
}

fn default_checkpoint_retention() -> usize {
    4
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            max_to_keep: default_checkpoint_retention(),
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Trace filename relative to `run_directory`.
    #[serde(default = "default_trace_filename")]
    pub trace_file: PathBuf,
    /// Per-step statistics filename relative to `run_directory`.
    #[serde(default = "default_stats_filename")]
    pub stats_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
    /// Subdirectory used for checkpoint files.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
}

fn default_trace_filename() -> PathBuf {
    PathBuf::from("trace.csv")
}

fn default_stats_filename() -> PathBuf {
    PathBuf::from("stats.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            trace_file: default_trace_filename(),
            stats_file: default_stats_filename(),
            manifest_file: default_manifest_filename(),
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}
