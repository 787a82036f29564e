use std::error::Error;
use std::fs;
use std::path::Path;

use hmc_core::{FloatKey, MemoryStore};
use hmc_sampler::{HarmonicWell, RunConfig};
use log::debug;
use serde::{Deserialize, Serialize};

/// One independent Gaussian component `N(mean, kT / stiffness)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetComponent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Starting value; defaults to the mean.
    #[serde(default)]
    pub initial: Option<f64>,
}

fn default_mass() -> f64 {
    1.0
}

fn default_stiffness() -> f64 {
    1.0
}

/// Run configuration plus the target it samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationFile {
    #[serde(flatten)]
    pub run: RunConfig,
    #[serde(default)]
    pub target: Vec<TargetComponent>,
}

pub fn load(path: &Path) -> Result<SimulationFile, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let file: SimulationFile = serde_yaml::from_str(&text)?;
    file.run.validate()?;
    Ok(file)
}

/// Builds one nuisance entity per component and the matching restraints.
pub fn build(components: &[TargetComponent]) -> Result<(MemoryStore, HarmonicWell), Box<dyn Error>> {
    let mut store = MemoryStore::new();
    let mut well = HarmonicWell::new();
    for (index, component) in components.iter().enumerate() {
        if !(component.mass.is_finite() && component.mass > 0.0) {
            return Err(format!("target[{index}]: mass must be finite and positive").into());
        }
        let name = component
            .name
            .clone()
            .unwrap_or_else(|| format!("x{index}"));
        let start = component.initial.unwrap_or(component.mean);
        let entity = store.add_nuisance(name, start, component.mass);
        well.add_term(FloatKey::NUISANCE, entity, component.stiffness, component.mean)?;
    }
    debug!("target built with {} components", components.len());
    Ok((store, well))
}
