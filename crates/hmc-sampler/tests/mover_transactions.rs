use hmc_core::{AttributeStore, FloatKey, HmcError, MemoryStore, RngHandle};
use proptest::prelude::*;

use hmc_sampler::{HarmonicWell, MolecularDynamicsMover, OptimizedVariables, Proposal, UnitSystem};

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|value| value.to_bits()).collect()
}

fn well_over(store: &MemoryStore, stiffness: f64) -> HarmonicWell {
    let mut well = HarmonicWell::new();
    for (key, entity) in OptimizedVariables::new(store).unwrap().interface().pairs() {
        well.add_term(key, entity, stiffness, 0.0).unwrap();
    }
    well
}

#[test]
fn zero_md_steps_are_rejected() {
    let err = MolecularDynamicsMover::new(UnitSystem::Reduced, 0, 0.1).unwrap_err();
    assert!(matches!(err, HmcError::Precondition(_)));
    assert_eq!(err.info().code, "invalid-md-steps");

    let mut mover = MolecularDynamicsMover::new(UnitSystem::Reduced, 5, 0.1).unwrap();
    assert!(mover.set_number_of_md_steps(0).is_err());
    assert_eq!(mover.get_number_of_md_steps(), 5);
}

#[test]
fn reject_without_propose_is_a_precondition_error() {
    let mut store = MemoryStore::new();
    store.add_nuisance("sigma", 1.0, 1.0);
    let mut mover = MolecularDynamicsMover::new(UnitSystem::Reduced, 5, 0.1).unwrap();

    let err = mover.reject(&mut store).unwrap_err();
    assert!(matches!(err, HmcError::Precondition(_)));
    assert_eq!(err.info().code, "reject-without-propose");
}

#[test]
fn accept_keeps_the_trajectory_end() {
    let mut store = MemoryStore::new();
    let n = store.add_nuisance("sigma", 1.0, 1.0);
    let well = well_over(&store, 1.0);
    let mut mover = MolecularDynamicsMover::new(UnitSystem::Reduced, 10, 0.1).unwrap();

    let result = mover.propose(&mut store, &well).unwrap();
    assert_eq!(result.entities, vec![n]);
    assert_eq!(result.proposal_ratio, 1.0);
    assert!(mover.has_pending_proposal());

    let moved = store.get_value(FloatKey::NUISANCE, n).unwrap();
    assert!(moved < 1.0);
    mover.accept();
    assert!(!mover.has_pending_proposal());
    assert_eq!(store.get_value(FloatKey::NUISANCE, n).unwrap(), moved);
    assert!(mover.reject(&mut store).is_err());
}

proptest! {
    #[test]
    fn reject_restores_bit_identical_state(
        coordinates in prop::collection::vec(-3.0f64..3.0, 7),
        stiffness in 0.1f64..5.0,
        timestep in 0.01f64..0.5,
        nsteps in 1usize..30,
        seed in any::<u64>(),
    ) {
        let mut store = MemoryStore::new();
        store.add_point("a", [coordinates[0], coordinates[1], coordinates[2]], 1.5);
        store.add_point("b", [coordinates[3], coordinates[4], coordinates[5]], 0.5);
        store.add_nuisance("sigma", coordinates[6], 2.0);
        let well = well_over(&store, stiffness);

        let mut mover = MolecularDynamicsMover::new(UnitSystem::Reduced, nsteps, timestep).unwrap();
        mover.md_mut().setup_degrees_of_freedom(&mut store).unwrap();
        let mut rng = RngHandle::from_seed(seed);
        mover.md().assign_velocities(&mut store, 1.0, &mut rng).unwrap();

        let positions = mover.md().positions().clone();
        let velocities = mover.md().velocities().clone();
        let x0 = bits(&positions.get_values(&store).unwrap());
        let v0 = bits(&velocities.get_values(&store).unwrap());

        mover.propose(&mut store, &well).unwrap();
        mover.reject(&mut store).unwrap();

        prop_assert_eq!(bits(&positions.get_values(&store).unwrap()), x0);
        prop_assert_eq!(bits(&velocities.get_values(&store).unwrap()), v0);
        prop_assert!(!mover.has_pending_proposal());
    }
}
