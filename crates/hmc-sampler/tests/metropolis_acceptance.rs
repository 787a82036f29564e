use hmc_core::{HmcError, RngHandle};
use proptest::prelude::*;
use rand::RngCore;

use hmc_sampler::Metropolis;

/// Fails the test if the driver consumes randomness.
struct NoDraws;

impl RngCore for NoDraws {
    fn next_u32(&mut self) -> u32 {
        panic!("unexpected draw")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("unexpected draw")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("unexpected draw")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        panic!("unexpected draw")
    }
}

#[test]
fn kt_must_be_positive() {
    assert!(matches!(Metropolis::new(0.0), Err(HmcError::Precondition(_))));
    assert!(Metropolis::new(f64::INFINITY).is_err());
    let mut driver = Metropolis::new(2.0).unwrap();
    assert!(driver.set_kt(-1.0).is_err());
    assert_eq!(driver.get_kt(), 2.0);
}

#[test]
fn downhill_moves_accept_without_drawing() {
    let mut driver = Metropolis::new(1.0).unwrap();
    let trial = driver.accept_or_reject(-3.0, 1.0, 1.0, &mut NoDraws);
    assert!(trial.accepted);
    assert_eq!(trial.probability, 1.0);
    let trial = driver.accept_or_reject(1.0, 1.0, 1.0, &mut NoDraws);
    assert!(trial.accepted);

    let stats = driver.stats();
    assert_eq!(stats.proposed, 2);
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.downward, 1);
    assert_eq!(stats.upward, 1);
}

#[test]
fn nan_energies_reject() {
    let mut driver = Metropolis::new(1.0).unwrap();
    let mut rng = RngHandle::from_seed(3);
    assert_eq!(driver.acceptance_probability(f64::NAN, 0.0, 1.0), 0.0);
    assert!(!driver.accept_or_reject(f64::NAN, 0.0, 1.0, &mut rng).accepted);
    assert!(!driver.accept_or_reject(f64::INFINITY, 0.0, 1.0, &mut rng).accepted);
    assert_eq!(driver.stats().acceptance_rate(), 0.0);
}

#[test]
fn uphill_acceptance_rate_matches_boltzmann_factor() {
    let mut driver = Metropolis::new(1.0).unwrap();
    let mut rng = RngHandle::from_seed(17);
    let trials = 20_000;
    for _ in 0..trials {
        driver.accept_or_reject(1.0, 0.0, 1.0, &mut rng);
    }
    let expected = (-1.0f64).exp();
    let rate = driver.stats().acceptance_rate();
    assert!((rate - expected).abs() < 0.02, "rate {rate}");

    driver.reset_stats();
    assert_eq!(driver.stats().proposed, 0);
}

proptest! {
    #[test]
    fn acceptance_probability_is_bounded(
        energy in -50.0f64..50.0,
        last in -50.0f64..50.0,
        kt in 0.01f64..10.0,
    ) {
        let driver = Metropolis::new(kt).unwrap();
        let probability = driver.acceptance_probability(energy, last, 1.0);
        prop_assert!((0.0..=1.0).contains(&probability));
        if energy <= last {
            prop_assert_eq!(probability, 1.0);
        } else {
            let expected = ((last - energy) / kt).exp();
            prop_assert!((probability - expected).abs() <= 1e-12 * expected.max(1e-300));
        }
    }
}
