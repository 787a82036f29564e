use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use hmc_core::errors::ErrorInfo;
use hmc_core::{HmcError, RunProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RunConfig;

/// Schema of manifests and checkpoints written by this crate.
pub const ARTIFACT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Structured manifest describing a completed sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema of this document.
    pub schema: SchemaVersion,
    /// Configuration hash, seed and timestamp.
    pub provenance: RunProvenance,
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Monte Carlo steps completed, including burn-in.
    pub steps: usize,
    /// Fraction of steps that accepted their trajectory.
    pub acceptance_rate: f64,
    /// Total energy of the final state.
    pub final_total_energy: f64,
    /// Trace file (relative to the run directory).
    pub trace_file: Option<PathBuf>,
    /// Statistics file (relative to the run directory).
    pub stats_file: Option<PathBuf>,
    /// Checkpoint files generated during the run (relative order preserved).
    pub checkpoints: Vec<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), HmcError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| HmcError::serde_at("manifest-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| HmcError::serde_at("manifest-serialize", err, path))?;
        fs::write(path, json).map_err(|err| HmcError::serde_at("manifest-write", err, path))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, HmcError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| HmcError::serde_at("manifest-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| HmcError::serde_at("manifest-parse", err, path))
    }
}

/// Stable hexadecimal SHA-256 of the JSON encoding of `config`.
pub fn config_hash(config: &RunConfig) -> Result<String, HmcError> {
    let bytes = serde_json::to_vec(config)
        .map_err(|err| HmcError::Serde(ErrorInfo::new("config-hash", err.to_string())))?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}

/// Provenance record for an artefact produced now from `config` and `seed`.
pub fn provenance(config: &RunConfig, seed: u64) -> Result<RunProvenance, HmcError> {
    let mut tool_versions = BTreeMap::new();
    tool_versions.insert(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    Ok(RunProvenance {
        input_hash: config_hash(config)?,
        seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions,
    })
}
