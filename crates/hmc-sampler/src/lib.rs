#![deny(missing_docs)]

//! Hybrid/Hamiltonian Monte Carlo over the optimized coordinates of an
//! attribute store.
//!
//! A [`HamiltonianMonteCarlo`] sampler repeatedly draws momenta, integrates a
//! velocity-Verlet trajectory through [`MolecularDynamics`] and accepts or
//! rejects the end point with a [`Metropolis`] test. Rejected trajectories are
//! undone by the [`MolecularDynamicsMover`]. The [`kernel`] module drives full
//! runs with deterministic per-step seeding, checkpoints and manifests.

/// Indexed (key, entity) bindings over an attribute store.
pub mod accessor;
/// Trace summaries for inspecting run artefacts.
pub mod analysis;
/// Checkpoint serialization helpers and payload structures.
pub mod checkpoint;
/// Selection of entities that carry dynamics.
pub mod classify;
/// YAML configuration schema and defaults.
pub mod config;
/// Transforms between constrained variables and unconstrained space.
pub mod constraint;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Velocity-Verlet integrator.
pub mod integrator;
/// Sampling kernel and public `run`/`resume` entry points.
pub mod kernel;
/// Log-density view of a scoring function.
pub mod log_density;
/// Run manifest serialization helpers.
pub mod manifest;
/// Metropolis acceptance driver.
pub mod metropolis;
/// Reversible trajectory proposals.
pub mod mover;
/// Reference potentials.
pub mod potentials;
/// Hamiltonian Monte Carlo sampler.
pub mod sampler;
/// Per-step statistics.
pub mod stats;
/// Trace recording and CSV I/O.
pub mod trace;
/// Unit systems and physical constants.
pub mod units;
/// Maxwell-Boltzmann velocity draws.
pub mod velocity;

pub use accessor::{OptimizedVariables, ValueGradientInterface};
pub use analysis::{ColumnSummary, TraceSummary};
pub use classify::{DynamicsKind, EntityClassifier, StandardClassifier};
pub use config::{CheckpointConfig, HmcConfig, OutputConfig, RunConfig, SeedPolicy};
pub use constraint::{
    transform_constraint, BoundedConstraint, IdentityConstraint, JointConstraint,
    LowerBoundedConstraint, UpperBoundedConstraint, VariableConstraint,
};
pub use integrator::{DegreeOfFreedom, MolecularDynamics};
pub use kernel::{resume, resume_in, run, RunSummary};
pub use log_density::{LogDensity, TransformedLogDensity};
pub use metropolis::{Metropolis, MonteCarloStats, Trial};
pub use mover::{MolecularDynamicsMover, Proposal, ProposalResult};
pub use potentials::{HarmonicTerm, HarmonicWell};
pub use sampler::{HamiltonianMonteCarlo, StepObserver, StepOutcome};
pub use stats::StatisticsAccumulator;
pub use trace::{TraceRecorder, TraceTable};
pub use units::UnitSystem;
pub use velocity::VelocityAssigner;
