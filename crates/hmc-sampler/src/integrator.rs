use std::fmt;

use hmc_core::{AttributeStore, EntityIndex, FloatKey, HmcError, ScoringFunction};
use log::{debug, warn};
use rand::Rng;

use crate::accessor::ValueGradientInterface;
use crate::classify::{DynamicsKind, EntityClassifier, StandardClassifier};
use crate::units::UnitSystem;
use crate::velocity::VelocityAssigner;

/// An entity taking part in dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeOfFreedom {
    /// Entity carrying the position and velocity attributes.
    pub entity: EntityIndex,
    /// Whether the entity is a point or a scalar.
    pub kind: DynamicsKind,
    /// Fixed mass of the entity.
    pub mass: f64,
}

/// Velocity-Verlet integrator over Cartesian points and nuisance scalars.
///
/// Positions and velocities live in the attribute store; the integrator keeps
/// only the co-indexed bindings and a per-component mass vector built by
/// [`MolecularDynamics::setup_degrees_of_freedom`].
pub struct MolecularDynamics {
    classifier: Box<dyn EntityClassifier>,
    units: UnitSystem,
    time_step: f64,
    dofs: Vec<DegreeOfFreedom>,
    positions: ValueGradientInterface,
    velocities: ValueGradientInterface,
    masses: Vec<f64>,
}

impl fmt::Debug for MolecularDynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MolecularDynamics")
            .field("units", &self.units)
            .field("time_step", &self.time_step)
            .field("dofs", &self.dofs)
            .finish_non_exhaustive()
    }
}

impl MolecularDynamics {
    /// Creates an integrator using the [`StandardClassifier`].
    pub fn new(units: UnitSystem, time_step: f64) -> Self {
        Self::with_classifier(units, time_step, Box::new(StandardClassifier))
    }

    /// Creates an integrator with a custom entity classifier.
    pub fn with_classifier(
        units: UnitSystem,
        time_step: f64,
        classifier: Box<dyn EntityClassifier>,
    ) -> Self {
        Self {
            classifier,
            units,
            time_step,
            dofs: Vec::new(),
            positions: ValueGradientInterface::from_pairs(Vec::new()),
            velocities: ValueGradientInterface::from_pairs(Vec::new()),
            masses: Vec::new(),
        }
    }

    /// Step size used by [`MolecularDynamics::simulate`].
    pub fn get_maximum_time_step(&self) -> f64 {
        self.time_step
    }

    /// Sets the step size.
    pub fn set_maximum_time_step(&mut self, time_step: f64) {
        self.time_step = time_step;
    }

    /// Unit system used for kinetic quantities.
    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Selects the entities eligible for dynamics and binds their attributes.
    ///
    /// Missing velocity attributes are created with value 0 and are not
    /// optimized. Calling this again rebuilds the bindings from scratch.
    pub fn setup_degrees_of_freedom(
        &mut self,
        store: &mut dyn AttributeStore,
    ) -> Result<(), HmcError> {
        let mut dofs = Vec::new();
        for entity in store.entities() {
            let Some(kind) = self.classifier.classify(&*store, entity) else {
                continue;
            };
            let mass = store.get_value(FloatKey::MASS, entity)?;
            for &key in kind.velocity_keys() {
                if !store.has_attribute(key, entity) {
                    store.add_attribute(key, entity, 0.0, false)?;
                }
            }
            dofs.push(DegreeOfFreedom { entity, kind, mass });
        }

        let mut position_pairs = Vec::new();
        let mut velocity_pairs = Vec::new();
        let mut masses = Vec::new();
        for dof in &dofs {
            for (&pk, &vk) in dof.kind.position_keys().iter().zip(dof.kind.velocity_keys()) {
                position_pairs.push((pk, dof.entity));
                velocity_pairs.push((vk, dof.entity));
                masses.push(dof.mass);
            }
        }
        self.positions = ValueGradientInterface::from_pairs(position_pairs);
        self.velocities = ValueGradientInterface::from_pairs(velocity_pairs);
        self.masses = masses;
        self.dofs = dofs;
        debug!(
            "dynamics set: {} entities, {} components",
            self.dofs.len(),
            self.masses.len()
        );
        Ok(())
    }

    /// Entities currently taking part in dynamics.
    pub fn degrees_of_freedom(&self) -> &[DegreeOfFreedom] {
        &self.dofs
    }

    /// Number of scalar components integrated.
    pub fn number_of_degrees_of_freedom(&self) -> usize {
        self.masses.len()
    }

    /// Managed entities in setup order.
    pub fn particles(&self) -> Vec<EntityIndex> {
        self.dofs.iter().map(|dof| dof.entity).collect()
    }

    /// Binding over every position component.
    pub fn positions(&self) -> &ValueGradientInterface {
        &self.positions
    }

    /// Binding over every velocity component, co-indexed with [`MolecularDynamics::positions`].
    pub fn velocities(&self) -> &ValueGradientInterface {
        &self.velocities
    }

    /// Mass of every component, co-indexed with the bindings.
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Current kinetic energy `½ Σ m v²` in potential energy units.
    pub fn get_kinetic_energy(&self, store: &dyn AttributeStore) -> Result<f64, HmcError> {
        let velocities = self.velocities.get_values(store)?;
        let sum: f64 = velocities
            .iter()
            .zip(&self.masses)
            .map(|(v, m)| m * v * v)
            .sum();
        Ok(0.5 * sum * self.units.kinetic_conversion())
    }

    /// Temperature implied by `ekinetic` under equipartition.
    pub fn get_kinetic_temperature(&self, ekinetic: f64) -> f64 {
        let dof = self.number_of_degrees_of_freedom();
        if dof == 0 {
            0.0
        } else {
            2.0 * ekinetic / (dof as f64 * self.units.boltzmann())
        }
    }

    /// Assigns Maxwell-Boltzmann velocities representative of `temperature`.
    pub fn assign_velocities<R: Rng + ?Sized>(
        &self,
        store: &mut dyn AttributeStore,
        temperature: f64,
        rng: &mut R,
    ) -> Result<(), HmcError> {
        VelocityAssigner::new(self.units).assign(
            store,
            &self.velocities,
            &self.masses,
            temperature,
            rng,
        )
    }

    /// Runs `nsteps` velocity-Verlet steps and returns the final potential energy.
    ///
    /// Derivatives are evaluated once up front and once per step. Returns
    /// `None` without touching the store or the oracle when there is nothing to
    /// integrate.
    pub fn simulate(
        &self,
        store: &mut dyn AttributeStore,
        scoring: &dyn ScoringFunction,
        nsteps: usize,
    ) -> Result<Option<f64>, HmcError> {
        if nsteps == 0 || self.masses.is_empty() {
            return Ok(None);
        }
        let mut energy = scoring.evaluate(store, true)?;
        for _ in 0..nsteps {
            energy = self.step(store, scoring)?;
        }
        if !energy.is_finite() {
            warn!("trajectory ended with non-finite potential energy {energy}");
        }
        Ok(Some(energy))
    }

    /// One velocity-Verlet step; derivatives in the store must match the current positions.
    pub fn step(
        &self,
        store: &mut dyn AttributeStore,
        scoring: &dyn ScoringFunction,
    ) -> Result<f64, HmcError> {
        self.propagate_coordinates(store, self.time_step)?;
        let energy = scoring.evaluate(store, true)?;
        self.propagate_velocities(store, self.time_step)?;
        Ok(energy)
    }

    /// Half kick with the current force followed by a full drift.
    fn propagate_coordinates(
        &self,
        store: &mut dyn AttributeStore,
        step_size: f64,
    ) -> Result<(), HmcError> {
        let mut x = self.positions.get_values(store)?;
        let mut v = self.velocities.get_values(store)?;
        let gradient = self.positions.get_gradient(store)?;
        let conversion = self.units.kinetic_conversion();
        for i in 0..x.len() {
            v[i] -= 0.5 * step_size * gradient[i] / (self.masses[i] * conversion);
            x[i] += step_size * v[i];
        }
        self.velocities.set_values(store, &v)?;
        self.positions.set_values(store, &x)
    }

    /// Second half kick with the force at the new position.
    fn propagate_velocities(
        &self,
        store: &mut dyn AttributeStore,
        step_size: f64,
    ) -> Result<(), HmcError> {
        let mut v = self.velocities.get_values(store)?;
        let gradient = self.positions.get_gradient(store)?;
        let conversion = self.units.kinetic_conversion();
        for i in 0..v.len() {
            v[i] -= 0.5 * step_size * gradient[i] / (self.masses[i] * conversion);
        }
        self.velocities.set_values(store, &v)
    }
}
