use hmc_core::errors::ErrorInfo;
use hmc_core::HmcError;
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Counters accumulated by the Metropolis driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloStats {
    /// Accept/reject tests performed.
    pub proposed: usize,
    /// Tests that accepted.
    pub accepted: usize,
    /// Accepted tests that lowered the energy.
    pub downward: usize,
    /// Accepted tests that raised (or kept) the energy.
    pub upward: usize,
}

impl MonteCarloStats {
    /// Fraction of tests that accepted (0 when none were made).
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

/// Outcome of one accept/reject test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Whether the test accepted.
    pub accepted: bool,
    /// Acceptance probability `min(1, ratio · exp(−ΔE/kT))`.
    pub probability: f64,
}

/// Generic Monte Carlo driver state: temperature, scoring mode and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metropolis {
    kt: f64,
    incremental_scoring: bool,
    stats: MonteCarloStats,
}

impl Metropolis {
    /// Creates a driver at temperature scale `kt`.
    pub fn new(kt: f64) -> Result<Self, HmcError> {
        let mut driver = Self {
            kt: 1.0,
            incremental_scoring: false,
            stats: MonteCarloStats::default(),
        };
        driver.set_kt(kt)?;
        Ok(driver)
    }

    /// Temperature scale in energy units.
    pub fn get_kt(&self) -> f64 {
        self.kt
    }

    /// Sets the temperature scale; it must be finite and strictly positive.
    pub fn set_kt(&mut self, kt: f64) -> Result<(), HmcError> {
        if !(kt.is_finite() && kt > 0.0) {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-kt", "kT must be finite and strictly positive")
                    .with_context("kt", kt.to_string()),
            ));
        }
        self.kt = kt;
        Ok(())
    }

    /// Whether the driver is configured for incremental scoring.
    pub fn get_use_incremental_scoring(&self) -> bool {
        self.incremental_scoring
    }

    /// Enables or disables incremental scoring mode.
    pub fn set_use_incremental_scoring(&mut self, enabled: bool) {
        self.incremental_scoring = enabled;
    }

    /// Fails when incremental scoring is enabled.
    pub fn ensure_full_scoring(&self) -> Result<(), HmcError> {
        if self.incremental_scoring {
            return Err(HmcError::UnsupportedMode(
                ErrorInfo::new("incremental-scoring", "Incremental scoring not supported")
                    .with_hint("disable incremental scoring on the driver"),
            ));
        }
        Ok(())
    }

    /// Acceptance statistics collected so far.
    pub fn stats(&self) -> &MonteCarloStats {
        &self.stats
    }

    /// Clears the acceptance statistics.
    pub fn reset_stats(&mut self) {
        self.stats = MonteCarloStats::default();
    }

    /// `min(1, ratio · exp(−(energy − last)/kT))`; NaN energies yield 0.
    pub fn acceptance_probability(&self, energy: f64, last: f64, proposal_ratio: f64) -> f64 {
        let probability = ((last - energy) / self.kt).exp() * proposal_ratio;
        if probability.is_nan() {
            0.0
        } else {
            probability.min(1.0)
        }
    }

    /// Runs one Metropolis test, drawing a fresh uniform when the outcome is not certain.
    pub fn accept_or_reject<R: Rng + ?Sized>(
        &mut self,
        energy: f64,
        last: f64,
        proposal_ratio: f64,
        rng: &mut R,
    ) -> Trial {
        if !(energy.is_finite() && last.is_finite()) {
            warn!("metropolis test on non-finite energies: new={energy} old={last}");
        }
        let probability = self.acceptance_probability(energy, last, proposal_ratio);
        let accepted = if probability >= 1.0 {
            true
        } else {
            rng.gen::<f64>() < probability
        };
        self.stats.proposed += 1;
        if accepted {
            self.stats.accepted += 1;
            if energy < last {
                self.stats.downward += 1;
            } else {
                self.stats.upward += 1;
            }
        }
        Trial {
            accepted,
            probability,
        }
    }
}
