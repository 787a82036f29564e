use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, EntityIndex, FloatKey, HmcError, ScoringFunction};
use serde::{Deserialize, Serialize};

/// One restraint `½ k (x − x₀)²` on a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicTerm {
    /// Restrained attribute.
    pub key: FloatKey,
    /// Entity carrying the attribute.
    pub entity: EntityIndex,
    /// Spring constant `k`.
    pub stiffness: f64,
    /// Rest value `x₀`.
    pub center: f64,
}

/// Sum of independent harmonic restraints.
///
/// With `kT = 1` each restrained attribute is Gaussian with mean `x₀` and
/// variance `1 / k`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarmonicWell {
    terms: Vec<HarmonicTerm>,
}

impl HarmonicWell {
    /// Creates an empty potential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a restraint; the stiffness must be finite and non-negative.
    pub fn add_term(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        stiffness: f64,
        center: f64,
    ) -> Result<&mut Self, HmcError> {
        if !(stiffness.is_finite() && stiffness >= 0.0) {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-stiffness", "stiffness must be finite and >= 0")
                    .with_context("stiffness", stiffness.to_string()),
            ));
        }
        self.terms.push(HarmonicTerm {
            key,
            entity,
            stiffness,
            center,
        });
        Ok(self)
    }

    /// Registered restraints.
    pub fn terms(&self) -> &[HarmonicTerm] {
        &self.terms
    }
}

impl ScoringFunction for HarmonicWell {
    fn evaluate(
        &self,
        store: &mut dyn AttributeStore,
        compute_derivatives: bool,
    ) -> Result<f64, HmcError> {
        if compute_derivatives {
            store.clear_derivatives();
        }
        let mut energy = 0.0;
        for term in &self.terms {
            let displacement = store.get_value(term.key, term.entity)? - term.center;
            energy += 0.5 * term.stiffness * displacement * displacement;
            if compute_derivatives {
                store.add_to_derivative(term.key, term.entity, term.stiffness * displacement)?;
            }
        }
        Ok(energy)
    }
}
