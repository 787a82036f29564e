use serde::{Deserialize, Serialize};

/// Boltzmann constant in kcal/(mol·K).
pub const BOLTZMANN_KCAL_PER_MOL_K: f64 = 8.31441 / 4186.6;

/// Kinetic energy of one Da·Å²/fs² expressed in kcal/mol.
pub const KCAL_PER_MOL_PER_DA_A2_FS2: f64 = 1.0 / 4.1868e-4;

/// Unit system shared by the integrator, the velocity assigner and the sampler.
///
/// Both constants are fixed for a given deployment:
///
/// * `boltzmann()` converts a temperature into the energy unit of the potential,
///   so `kT = boltzmann() * T`.
/// * `kinetic_conversion()` converts `m v²` into that energy unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitSystem {
    /// Dimensionless units: kB = 1 and K = ½ m v².
    #[default]
    Reduced,
    /// kcal/mol, Å, fs and Da.
    Molecular,
}

impl UnitSystem {
    /// Energy per unit temperature.
    pub fn boltzmann(&self) -> f64 {
        match self {
            UnitSystem::Reduced => 1.0,
            UnitSystem::Molecular => BOLTZMANN_KCAL_PER_MOL_K,
        }
    }

    /// Energy per unit of mass × velocity².
    pub fn kinetic_conversion(&self) -> f64 {
        match self {
            UnitSystem::Reduced => 1.0,
            UnitSystem::Molecular => KCAL_PER_MOL_PER_DA_A2_FS2,
        }
    }

    /// Temperature corresponding to the energy scale `kt`.
    pub fn temperature_for_kt(&self, kt: f64) -> f64 {
        kt / self.boltzmann()
    }
}
