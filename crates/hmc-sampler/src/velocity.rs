use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, HmcError};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::accessor::ValueGradientInterface;
use crate::units::UnitSystem;

/// Draws Maxwell-Boltzmann velocities.
///
/// Every component is independent and normal with mean 0 and variance
/// `kB·T / (m · kinetic_conversion)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityAssigner {
    units: UnitSystem,
}

impl VelocityAssigner {
    /// Creates an assigner for the given unit system.
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    /// Unit system used for the draws.
    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Standard deviation of one velocity component of mass `mass` at `temperature`.
    pub fn standard_deviation(&self, mass: f64, temperature: f64) -> f64 {
        (self.units.boltzmann() * temperature / (mass * self.units.kinetic_conversion())).sqrt()
    }

    /// Draws one velocity per mass slot.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        masses: &[f64],
        temperature: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>, HmcError> {
        if !(temperature.is_finite() && temperature >= 0.0) {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-temperature", "temperature must be finite and >= 0")
                    .with_context("temperature", temperature.to_string()),
            ));
        }
        Ok(masses
            .iter()
            .map(|&mass| {
                let z: f64 = rng.sample(StandardNormal);
                z * self.standard_deviation(mass, temperature)
            })
            .collect())
    }

    /// Draws fresh velocities and writes them through `velocities`.
    pub fn assign<R: Rng + ?Sized>(
        &self,
        store: &mut dyn AttributeStore,
        velocities: &ValueGradientInterface,
        masses: &[f64],
        temperature: f64,
        rng: &mut R,
    ) -> Result<(), HmcError> {
        let drawn = self.draw(masses, temperature, rng)?;
        velocities.set_values(store, &drawn)
    }
}
