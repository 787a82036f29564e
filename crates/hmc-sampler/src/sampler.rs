use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, HmcError, ScoringFunction};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::HmcConfig;
use crate::integrator::MolecularDynamics;
use crate::metropolis::{Metropolis, MonteCarloStats};
use crate::mover::{MolecularDynamicsMover, Proposal};

/// Everything observed during one Monte Carlo step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Whether one of the trials accepted the trajectory.
    pub accepted: bool,
    /// Accept/reject tests run against the same trajectory.
    pub trials: usize,
    /// Whether momenta were redrawn at the start of the step.
    pub velocities_refreshed: bool,
    /// Total energy before the trajectory.
    pub energy_old: f64,
    /// Total energy at the end of the trajectory.
    pub energy_new: f64,
    /// Acceptance probability of the trajectory.
    pub acceptance_probability: f64,
    /// Kinetic energy of the state the step ended in.
    pub kinetic_energy: f64,
    /// Potential energy of the state the step ended in.
    pub potential_energy: f64,
}

impl StepOutcome {
    /// `energy_new − energy_old`.
    pub fn delta_energy(&self) -> f64 {
        self.energy_new - self.energy_old
    }

    /// Total energy of the state the step ended in.
    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy + self.potential_energy
    }
}

/// Callback run after every completed Monte Carlo step.
pub trait StepObserver {
    /// Receives the step index (counting from 0), the store and the outcome.
    fn update(
        &mut self,
        step: usize,
        store: &dyn AttributeStore,
        outcome: &StepOutcome,
    ) -> Result<(), HmcError>;
}

/// Hamiltonian Monte Carlo over every massed point and nuisance in a store.
///
/// Velocities persist for `persistence` Monte Carlo steps. Because a rejected
/// trajectory restores the same positions and momenta, rerunning it would give
/// the same energies; repeated rejections are therefore retried against the
/// cached energies with a fresh uniform draw until one accepts or the
/// persistence window closes. The number of retries depends only on the
/// persistence counter, never on trial outcomes.
#[derive(Debug)]
pub struct HamiltonianMonteCarlo<S, F> {
    store: S,
    scoring: F,
    mover: MolecularDynamicsMover,
    driver: Metropolis,
    persistence: usize,
    persistence_counter: usize,
    steps_taken: usize,
}

impl<S, F> HamiltonianMonteCarlo<S, F>
where
    S: AttributeStore,
    F: ScoringFunction,
{
    /// Builds a sampler owning `store` and `scoring`.
    pub fn new(mut store: S, scoring: F, config: &HmcConfig) -> Result<Self, HmcError> {
        config.validate()?;
        let mut mover =
            MolecularDynamicsMover::new(config.units, config.number_of_md_steps, config.timestep)?;
        mover.md_mut().setup_degrees_of_freedom(&mut store)?;
        let mut driver = Metropolis::new(config.kt)?;
        driver.set_use_incremental_scoring(config.incremental_scoring);
        Ok(Self {
            store,
            scoring,
            mover,
            driver,
            persistence: config.persistence,
            persistence_counter: 0,
            steps_taken: 0,
        })
    }

    /// Performs one Monte Carlo step using `rng` for momenta and accept/reject draws.
    pub fn do_step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<StepOutcome, HmcError> {
        self.driver.ensure_full_scoring()?;
        self.mover
            .md_mut()
            .setup_degrees_of_freedom(&mut self.store)?;

        let mut counter = self.persistence_counter + 1;
        let velocities_refreshed = counter >= self.persistence;
        if velocities_refreshed {
            counter = 0;
            let temperature = self
                .mover
                .md()
                .units()
                .temperature_for_kt(self.driver.get_kt());
            self.mover
                .md()
                .assign_velocities(&mut self.store, temperature, rng)?;
        }
        self.persistence_counter = counter;

        let last = self.do_evaluate()?;
        let moved = match self.mover.propose(&mut self.store, &self.scoring) {
            Ok(moved) => moved,
            Err(err) => return Err(self.abort_proposal(err)),
        };
        let energy = match self.do_evaluate() {
            Ok(energy) => energy,
            Err(err) => return Err(self.abort_proposal(err)),
        };

        let mut trial = self
            .driver
            .accept_or_reject(energy, last, moved.proposal_ratio, rng);
        let mut trials = 1;
        while !trial.accepted && self.persistence_counter + 1 < self.persistence {
            self.persistence_counter += 1;
            trial = self
                .driver
                .accept_or_reject(energy, last, moved.proposal_ratio, rng);
            trials += 1;
        }

        if trial.accepted {
            self.mover.accept();
        } else {
            self.mover.reject(&mut self.store)?;
        }
        self.steps_taken += 1;

        let kinetic_energy = self.get_kinetic_energy()?;
        let potential_energy = self.get_potential_energy()?;
        debug!(
            "hmc old {last} new {energy} delta {} accepted {} trials {trials}",
            energy - last,
            trial.accepted
        );
        Ok(StepOutcome {
            accepted: trial.accepted,
            trials,
            velocities_refreshed,
            energy_old: last,
            energy_new: energy,
            acceptance_probability: trial.probability,
            kinetic_energy,
            potential_energy,
        })
    }

    /// Runs `steps` Monte Carlo steps, notifying every observer after each one.
    ///
    /// Returns the total energy of the final state.
    pub fn optimize<R: Rng + ?Sized>(
        &mut self,
        steps: usize,
        rng: &mut R,
        observers: &mut [&mut dyn StepObserver],
    ) -> Result<f64, HmcError> {
        for _ in 0..steps {
            let step = self.steps_taken;
            let outcome = self.do_step(rng)?;
            for observer in observers.iter_mut() {
                observer.update(step, &self.store, &outcome)?;
            }
        }
        self.get_total_energy()
    }

    /// Total energy (kinetic + potential) used by the Metropolis test.
    pub fn do_evaluate(&mut self) -> Result<f64, HmcError> {
        self.driver.ensure_full_scoring()?;
        let ekin = self.mover.md().get_kinetic_energy(&self.store)?;
        let epot = self.scoring.evaluate(&mut self.store, false)?;
        Ok(ekin + epot)
    }

    /// Kinetic energy of the managed velocities.
    pub fn get_kinetic_energy(&self) -> Result<f64, HmcError> {
        self.mover.md().get_kinetic_energy(&self.store)
    }

    /// Potential energy reported by the scoring function.
    pub fn get_potential_energy(&mut self) -> Result<f64, HmcError> {
        self.driver.ensure_full_scoring()?;
        self.scoring.evaluate(&mut self.store, false)
    }

    /// Kinetic plus potential energy.
    pub fn get_total_energy(&mut self) -> Result<f64, HmcError> {
        self.do_evaluate()
    }

    /// Integrator step size.
    pub fn get_timestep(&self) -> f64 {
        self.mover.md().get_maximum_time_step()
    }

    /// Sets the integrator step size.
    pub fn set_timestep(&mut self, timestep: f64) -> Result<(), HmcError> {
        if !(timestep.is_finite() && timestep >= 0.0) {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-timestep", "timestep must be finite and non-negative")
                    .with_context("timestep", timestep.to_string()),
            ));
        }
        self.mover.md_mut().set_maximum_time_step(timestep);
        Ok(())
    }

    /// Integrator steps per Monte Carlo step.
    pub fn get_number_of_md_steps(&self) -> usize {
        self.mover.get_number_of_md_steps()
    }

    /// Sets the integrator steps per Monte Carlo step; zero is rejected.
    pub fn set_number_of_md_steps(&mut self, nsteps: usize) -> Result<(), HmcError> {
        self.mover.set_number_of_md_steps(nsteps)
    }

    /// Monte Carlo steps between momentum refreshes.
    pub fn get_persistence(&self) -> usize {
        self.persistence
    }

    /// Sets how many Monte Carlo steps happen until the momenta are redrawn.
    ///
    /// A counter past the new period is clamped to `persistence - 1`, so the
    /// next step redraws the momenta.
    pub fn set_persistence(&mut self, persistence: usize) -> Result<(), HmcError> {
        if persistence == 0 {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-persistence", "persistence must be at least one")
                    .with_context("persistence", persistence.to_string()),
            ));
        }
        self.persistence = persistence;
        self.persistence_counter = self.persistence_counter.min(persistence - 1);
        Ok(())
    }

    /// Position of the persistence counter in `[0, persistence)`.
    pub fn persistence_counter(&self) -> usize {
        self.persistence_counter
    }

    /// Restores the persistence counter, e.g. from a checkpoint.
    pub fn set_persistence_counter(&mut self, counter: usize) -> Result<(), HmcError> {
        if counter >= self.persistence {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-persistence-counter", "counter must be below persistence")
                    .with_context("counter", counter.to_string())
                    .with_context("persistence", self.persistence.to_string()),
            ));
        }
        self.persistence_counter = counter;
        Ok(())
    }

    /// Number of completed Monte Carlo steps.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Overrides the completed step count, e.g. when resuming.
    pub fn set_steps_taken(&mut self, steps: usize) {
        self.steps_taken = steps;
    }

    /// Temperature scale.
    pub fn get_kt(&self) -> f64 {
        self.driver.get_kt()
    }

    /// Sets the temperature scale.
    pub fn set_kt(&mut self, kt: f64) -> Result<(), HmcError> {
        self.driver.set_kt(kt)
    }

    /// Enables or disables incremental scoring on the driver.
    pub fn set_use_incremental_scoring(&mut self, enabled: bool) {
        self.driver.set_use_incremental_scoring(enabled);
    }

    /// Acceptance statistics of the Metropolis driver.
    pub fn stats(&self) -> &MonteCarloStats {
        self.driver.stats()
    }

    /// The integrator driven by the mover.
    pub fn md(&self) -> &MolecularDynamics {
        self.mover.md()
    }

    /// Mutable access to the integrator for settings not exposed here.
    pub fn md_mut(&mut self) -> &mut MolecularDynamics {
        self.mover.md_mut()
    }

    /// The trajectory mover.
    pub fn mover(&self) -> &MolecularDynamicsMover {
        &self.mover
    }

    /// The attribute store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the attribute store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The scoring function.
    pub fn scoring(&self) -> &F {
        &self.scoring
    }

    /// Releases the store and the scoring function.
    pub fn into_parts(self) -> (S, F) {
        (self.store, self.scoring)
    }

    fn abort_proposal(&mut self, err: HmcError) -> HmcError {
        if self.mover.has_pending_proposal() {
            if let Err(restore_err) = self.mover.reject(&mut self.store) {
                return restore_err;
            }
        }
        err
    }
}
