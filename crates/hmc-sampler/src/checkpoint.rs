use std::fs;
use std::path::{Path, PathBuf};

use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, EntityIndex, FloatKey, HmcError, RunProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::accessor::ValueGradientInterface;
use crate::config::RunConfig;
use crate::manifest::{self, ARTIFACT_SCHEMA};

/// One attribute value addressed by raw key and entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyedValue {
    /// Attribute key.
    pub key: FloatKey,
    /// Entity carrying the attribute.
    pub entity: EntityIndex,
    /// Stored value.
    pub value: f64,
}

/// Serializable sampler state written between Monte Carlo steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Schema of the payload.
    pub schema: SchemaVersion,
    /// Configuration hash, seed and timestamp.
    pub provenance: RunProvenance,
    /// Configuration snapshot associated with the run.
    pub config: RunConfig,
    /// Master seed used to derive per-step substreams.
    pub master_seed: u64,
    /// Number of completed Monte Carlo steps.
    pub step: usize,
    /// Persistence counter after the last completed step.
    pub persistence_counter: usize,
    /// Managed coordinates.
    pub positions: Vec<KeyedValue>,
    /// Managed velocities.
    pub velocities: Vec<KeyedValue>,
}

impl CheckpointPayload {
    /// Restores the payload from disk, rejecting incompatible schemas.
    pub fn load(path: &Path) -> Result<Self, HmcError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| HmcError::serde_at("checkpoint-read", err, path))?;
        let payload: CheckpointPayload = serde_json::from_str(&contents)
            .map_err(|err| HmcError::serde_at("checkpoint-parse", err, path))?;
        if !ARTIFACT_SCHEMA.is_compatible_with(&payload.schema) {
            return Err(HmcError::Serde(
                ErrorInfo::new("checkpoint-schema", "checkpoint schema is not supported")
                    .with_context("path", path.display().to_string())
                    .with_context(
                        "schema",
                        format!(
                            "{}.{}.{}",
                            payload.schema.major, payload.schema.minor, payload.schema.patch
                        ),
                    ),
            ));
        }
        Ok(payload)
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), HmcError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| HmcError::serde_at("checkpoint-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| HmcError::serde_at("checkpoint-serialize", err, path))?;
        fs::write(path, json).map_err(|err| HmcError::serde_at("checkpoint-write", err, path))
    }

    /// Writes the stored positions and velocities back into `store`.
    ///
    /// Every attribute is checked before the first write, so a payload that
    /// does not match the store leaves it untouched.
    pub fn apply_to(&self, store: &mut dyn AttributeStore) -> Result<(), HmcError> {
        let values = self.positions.iter().chain(&self.velocities);
        for item in values.clone() {
            if !store.has_attribute(item.key, item.entity) {
                return Err(HmcError::Store(
                    ErrorInfo::new("checkpoint-mismatch", "store lacks a checkpointed attribute")
                        .with_context("key", item.key.name())
                        .with_context("entity", item.entity.to_string()),
                ));
            }
        }
        for item in values {
            store.set_value(item.key, item.entity, item.value)?;
        }
        Ok(())
    }
}

/// Captures the state bound by `positions` and `velocities` after `step` completed steps.
pub fn build_payload(
    step: usize,
    persistence_counter: usize,
    config: &RunConfig,
    master_seed: u64,
    store: &dyn AttributeStore,
    positions: &ValueGradientInterface,
    velocities: &ValueGradientInterface,
) -> Result<CheckpointPayload, HmcError> {
    Ok(CheckpointPayload {
        schema: ARTIFACT_SCHEMA,
        provenance: manifest::provenance(config, master_seed)?,
        config: config.clone(),
        master_seed,
        step,
        persistence_counter,
        positions: keyed_values(store, positions)?,
        velocities: keyed_values(store, velocities)?,
    })
}

fn keyed_values(
    store: &dyn AttributeStore,
    interface: &ValueGradientInterface,
) -> Result<Vec<KeyedValue>, HmcError> {
    interface
        .pairs()
        .map(|(key, entity)| {
            Ok(KeyedValue {
                key,
                entity,
                value: store.get_value(key, entity)?,
            })
        })
        .collect()
}

/// Checkpoint file for `step` completed steps under `root`.
pub fn checkpoint_path(root: &Path, step: usize) -> PathBuf {
    root.join(format!("ckpt_{step:05}.json"))
}
