use std::cell::Cell;

use hmc_core::{
    AttributeStore, EntityIndex, FloatKey, HmcError, MemoryStore, RngHandle, ScoringFunction,
};

use hmc_sampler::{DynamicsKind, HarmonicWell, MolecularDynamics, UnitSystem};

struct CountingWell {
    inner: HarmonicWell,
    gradient_calls: Cell<usize>,
}

impl ScoringFunction for CountingWell {
    fn evaluate(
        &self,
        store: &mut dyn AttributeStore,
        compute_derivatives: bool,
    ) -> Result<f64, HmcError> {
        if compute_derivatives {
            self.gradient_calls.set(self.gradient_calls.get() + 1);
        }
        self.inner.evaluate(store, compute_derivatives)
    }
}

fn oscillator() -> (MemoryStore, EntityIndex, HarmonicWell) {
    let mut store = MemoryStore::new();
    let n = store.add_nuisance("q", 1.0, 1.0);
    let mut well = HarmonicWell::new();
    well.add_term(FloatKey::NUISANCE, n, 1.0, 0.0).unwrap();
    (store, n, well)
}

fn max_energy_error(time_step: f64, total_time: f64) -> f64 {
    let (mut store, _, well) = oscillator();
    let mut md = MolecularDynamics::new(UnitSystem::Reduced, time_step);
    md.setup_degrees_of_freedom(&mut store).unwrap();
    let initial = well.evaluate(&mut store, false).unwrap() + md.get_kinetic_energy(&store).unwrap();
    let steps = (total_time / time_step).round() as usize;
    let mut worst: f64 = 0.0;
    for _ in 0..steps {
        md.simulate(&mut store, &well, 1).unwrap();
        let energy =
            well.evaluate(&mut store, false).unwrap() + md.get_kinetic_energy(&store).unwrap();
        worst = worst.max((energy - initial).abs());
    }
    worst
}

#[test]
fn velocity_verlet_conserves_harmonic_energy() {
    let error = max_energy_error(0.1, 10.0);
    assert!(error < 5e-3, "energy drift {error}");
}

#[test]
fn energy_error_shrinks_with_the_time_step() {
    let coarse = max_energy_error(0.2, 10.0);
    let fine = max_energy_error(0.05, 10.0);
    assert!(coarse > 0.0);
    assert!(fine < coarse / 4.0, "coarse {coarse} fine {fine}");
}

#[test]
fn simulate_evaluates_derivatives_once_per_step_plus_one() {
    let (mut store, n, well) = oscillator();
    let counting = CountingWell {
        inner: well,
        gradient_calls: Cell::new(0),
    };
    let mut md = MolecularDynamics::new(UnitSystem::Reduced, 0.1);
    md.setup_degrees_of_freedom(&mut store).unwrap();

    let energy = md.simulate(&mut store, &counting, 7).unwrap().unwrap();
    assert_eq!(counting.gradient_calls.get(), 8);
    let q = store.get_value(FloatKey::NUISANCE, n).unwrap();
    assert!((energy - 0.5 * q * q).abs() < 1e-12);
}

#[test]
fn nothing_to_integrate_returns_none_without_scoring() {
    let mut store = MemoryStore::new();
    let counting = CountingWell {
        inner: HarmonicWell::new(),
        gradient_calls: Cell::new(0),
    };
    let mut md = MolecularDynamics::new(UnitSystem::Reduced, 0.1);
    md.setup_degrees_of_freedom(&mut store).unwrap();

    assert_eq!(md.number_of_degrees_of_freedom(), 0);
    assert_eq!(md.simulate(&mut store, &counting, 10).unwrap(), None);
    assert_eq!(counting.gradient_calls.get(), 0);
    assert_eq!(md.get_kinetic_energy(&store).unwrap(), 0.0);
}

#[test]
fn setup_selects_massed_points_and_nuisances() {
    let mut store = MemoryStore::new();
    let point = store.add_point("atom", [0.0, 0.0, 0.0], 2.0);
    let nuisance = store.add_nuisance("sigma", 1.0, 3.0);

    let massless = store.add_entity("massless");
    for key in FloatKey::xyz_keys() {
        store.add_attribute(key, massless, 0.0, true).unwrap();
    }
    let free_mass = store.add_point("free-mass", [0.0, 0.0, 0.0], 1.0);
    store.set_is_optimized(FloatKey::MASS, free_mass, true).unwrap();
    let zero_mass = store.add_nuisance("zero-mass", 0.0, 0.0);
    let nan_mass = store.add_nuisance("nan-mass", 0.0, f64::NAN);
    let partial = store.add_entity("partial");
    store.add_attribute(FloatKey::X, partial, 0.0, true).unwrap();
    store.add_attribute(FloatKey::MASS, partial, 1.0, false).unwrap();

    let mut md = MolecularDynamics::new(UnitSystem::Reduced, 0.1);
    md.setup_degrees_of_freedom(&mut store).unwrap();

    assert_eq!(md.particles(), vec![point, nuisance]);
    assert_eq!(md.degrees_of_freedom()[0].kind, DynamicsKind::Positional);
    assert_eq!(md.degrees_of_freedom()[1].kind, DynamicsKind::Scalar);
    assert_eq!(md.number_of_degrees_of_freedom(), 4);
    assert_eq!(md.masses(), &[2.0, 2.0, 2.0, 3.0]);
    assert_eq!(md.positions().dimension(), md.velocities().dimension());

    for key in [FloatKey::VX, FloatKey::VY, FloatKey::VZ] {
        assert_eq!(store.get_value(key, point).unwrap(), 0.0);
        assert!(!store.is_optimized(key, point));
    }
    assert!(store.has_attribute(FloatKey::VNUISANCE, nuisance));
    for excluded in [massless, free_mass, zero_mass, nan_mass, partial] {
        assert!(!store.has_attribute(FloatKey::VX, excluded));
        assert!(!store.has_attribute(FloatKey::VNUISANCE, excluded));
    }
}

#[test]
fn setup_keeps_existing_velocities() {
    let mut store = MemoryStore::new();
    let n = store.add_nuisance("sigma", 1.0, 1.0);
    store.add_attribute(FloatKey::VNUISANCE, n, 0.75, false).unwrap();

    let mut md = MolecularDynamics::new(UnitSystem::Reduced, 0.1);
    md.setup_degrees_of_freedom(&mut store).unwrap();
    md.setup_degrees_of_freedom(&mut store).unwrap();

    assert_eq!(store.get_value(FloatKey::VNUISANCE, n).unwrap(), 0.75);
    assert_eq!(md.number_of_degrees_of_freedom(), 1);
}

#[test]
fn molecular_units_convert_kinetic_energy() {
    let mut store = MemoryStore::new();
    let p = store.add_point("carbon", [0.0, 0.0, 0.0], 12.0);
    let mut md = MolecularDynamics::new(UnitSystem::Molecular, 2.0);
    md.setup_degrees_of_freedom(&mut store).unwrap();
    store.set_value(FloatKey::VX, p, 0.01).unwrap();

    let ekin = md.get_kinetic_energy(&store).unwrap();
    let expected = 0.5 * 12.0 * 0.01 * 0.01 / 4.1868e-4;
    assert!((ekin - expected).abs() < 1e-12);

    let temperature = md.get_kinetic_temperature(ekin);
    let kb = 8.31441 / 4186.6;
    assert!((temperature - 2.0 * ekin / (3.0 * kb)).abs() < 1e-9);
}

#[test]
fn assigned_velocities_match_temperature_on_average() {
    let mut store = MemoryStore::new();
    for i in 0..1000 {
        store.add_point(format!("p{i}"), [0.0, 0.0, 0.0], 4.0);
    }
    let mut md = MolecularDynamics::new(UnitSystem::Reduced, 0.1);
    md.setup_degrees_of_freedom(&mut store).unwrap();
    let mut rng = RngHandle::from_seed(11);

    md.assign_velocities(&mut store, 2.0, &mut rng).unwrap();
    let temperature = md.get_kinetic_temperature(md.get_kinetic_energy(&store).unwrap());
    assert!((temperature - 2.0).abs() < 0.25, "temperature {temperature}");
}
