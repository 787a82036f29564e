use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, EntityIndex, HmcError, ScoringFunction};
use log::debug;

use crate::accessor::ValueGradientInterface;
use crate::integrator::MolecularDynamics;
use crate::units::UnitSystem;

/// Result of a proposal handed to the Metropolis test.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalResult {
    /// Entities whose state the proposal changed.
    pub entities: Vec<EntityIndex>,
    /// Ratio of forward to backward proposal probabilities.
    pub proposal_ratio: f64,
}

/// Reversible Monte Carlo move.
///
/// `propose` mutates the store and remembers enough to undo itself; `reject`
/// undoes the most recent proposal and `accept` commits it.
pub trait Proposal {
    /// Entities read or written by the move.
    fn inputs(&self) -> Vec<EntityIndex>;

    /// Applies a new proposal to the store.
    fn propose(
        &mut self,
        store: &mut dyn AttributeStore,
        scoring: &dyn ScoringFunction,
    ) -> Result<ProposalResult, HmcError>;

    /// Restores the state saved by the most recent [`Proposal::propose`].
    fn reject(&mut self, store: &mut dyn AttributeStore) -> Result<(), HmcError>;

    /// Commits the most recent proposal.
    fn accept(&mut self) {}
}

/// Value copy of every managed position and velocity, taken before a trajectory.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    positions: ValueGradientInterface,
    velocities: ValueGradientInterface,
    coordinates: Vec<f64>,
    velocity_values: Vec<f64>,
}

impl Snapshot {
    fn capture(md: &MolecularDynamics, store: &dyn AttributeStore) -> Result<Self, HmcError> {
        Ok(Self {
            positions: md.positions().clone(),
            velocities: md.velocities().clone(),
            coordinates: md.positions().get_values(store)?,
            velocity_values: md.velocities().get_values(store)?,
        })
    }

    fn restore(&self, store: &mut dyn AttributeStore) -> Result<(), HmcError> {
        self.positions.set_values(store, &self.coordinates)?;
        self.velocities.set_values(store, &self.velocity_values)
    }
}

/// Moves continuous variables along a constant-energy MD trajectory.
#[derive(Debug)]
pub struct MolecularDynamicsMover {
    md: MolecularDynamics,
    nsteps: usize,
    snapshot: Option<Snapshot>,
}

impl MolecularDynamicsMover {
    /// Creates a mover running `nsteps` integrator steps of size `timestep`.
    pub fn new(units: UnitSystem, nsteps: usize, timestep: f64) -> Result<Self, HmcError> {
        Self::with_md(MolecularDynamics::new(units, timestep), nsteps)
    }

    /// Wraps an already configured integrator.
    pub fn with_md(md: MolecularDynamics, nsteps: usize) -> Result<Self, HmcError> {
        let mut mover = Self {
            md,
            nsteps: 1,
            snapshot: None,
        };
        mover.set_number_of_md_steps(nsteps)?;
        Ok(mover)
    }

    /// The owned integrator.
    pub fn md(&self) -> &MolecularDynamics {
        &self.md
    }

    /// Mutable access to the owned integrator for advanced configuration.
    pub fn md_mut(&mut self) -> &mut MolecularDynamics {
        &mut self.md
    }

    /// Integrator steps per proposal.
    pub fn get_number_of_md_steps(&self) -> usize {
        self.nsteps
    }

    /// Sets the integrator steps per proposal; zero is rejected.
    pub fn set_number_of_md_steps(&mut self, nsteps: usize) -> Result<(), HmcError> {
        if nsteps == 0 {
            return Err(HmcError::Precondition(
                ErrorInfo::new("invalid-md-steps", "nsteps must be positive!")
                    .with_context("nsteps", nsteps.to_string()),
            ));
        }
        self.nsteps = nsteps;
        Ok(())
    }

    /// Whether a proposal is waiting for accept or reject.
    pub fn has_pending_proposal(&self) -> bool {
        self.snapshot.is_some()
    }
}

impl Proposal for MolecularDynamicsMover {
    fn inputs(&self) -> Vec<EntityIndex> {
        self.md.particles()
    }

    fn propose(
        &mut self,
        store: &mut dyn AttributeStore,
        scoring: &dyn ScoringFunction,
    ) -> Result<ProposalResult, HmcError> {
        self.md.setup_degrees_of_freedom(store)?;
        self.snapshot = Some(Snapshot::capture(&self.md, &*store)?);
        self.md.simulate(store, scoring, self.nsteps)?;
        Ok(ProposalResult {
            entities: self.md.particles(),
            proposal_ratio: 1.0,
        })
    }

    fn reject(&mut self, store: &mut dyn AttributeStore) -> Result<(), HmcError> {
        let Some(snapshot) = self.snapshot.take() else {
            return Err(HmcError::Precondition(ErrorInfo::new(
                "reject-without-propose",
                "reject called without a pending proposal",
            )));
        };
        debug!(
            "restoring {} components from snapshot",
            snapshot.coordinates.len()
        );
        snapshot.restore(store)
    }

    fn accept(&mut self) {
        self.snapshot = None;
    }
}
