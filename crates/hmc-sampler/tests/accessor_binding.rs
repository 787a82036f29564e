use hmc_core::{AttributeStore, EntityIndex, FloatKey, HmcError, MemoryStore};
use proptest::prelude::*;

use hmc_sampler::{OptimizedVariables, ValueGradientInterface};

fn nuisance_store(values: &[f64]) -> (MemoryStore, Vec<EntityIndex>) {
    let mut store = MemoryStore::new();
    let entities = values
        .iter()
        .enumerate()
        .map(|(i, &value)| store.add_nuisance(format!("n{i}"), value, 1.0))
        .collect();
    (store, entities)
}

#[test]
fn mismatched_key_and_entity_lists_are_rejected() {
    let err = ValueGradientInterface::new(
        vec![FloatKey::X, FloatKey::Y],
        vec![EntityIndex::from_raw(0)],
    )
    .unwrap_err();
    assert!(matches!(err, HmcError::Precondition(_)));
    assert_eq!(err.info().code, "binding-length-mismatch");
}

#[test]
fn values_and_gradients_follow_binding_order() {
    let mut store = MemoryStore::new();
    let p = store.add_point("atom", [1.0, 2.0, 3.0], 1.0);
    let n = store.add_nuisance("sigma", 4.0, 1.0);
    let binding =
        ValueGradientInterface::new(vec![FloatKey::NUISANCE, FloatKey::Z, FloatKey::X], vec![n, p, p])
            .unwrap();

    assert_eq!(binding.dimension(), 3);
    assert_eq!(binding.get_values(&store).unwrap(), vec![4.0, 3.0, 1.0]);

    store.add_to_derivative(FloatKey::Z, p, -0.5).unwrap();
    assert_eq!(binding.get_gradient(&store).unwrap(), vec![0.0, -0.5, 0.0]);

    binding.set_values(&mut store, &[5.0, 6.0, 7.0]).unwrap();
    assert_eq!(store.get_value(FloatKey::NUISANCE, n).unwrap(), 5.0);
    assert_eq!(store.get_value(FloatKey::Z, p).unwrap(), 6.0);
    assert_eq!(store.get_value(FloatKey::X, p).unwrap(), 7.0);
    assert_eq!(binding.inputs(), vec![n, p]);
    assert!(binding.outputs().is_empty());
}

#[test]
fn set_values_with_missing_attribute_writes_nothing() {
    let (mut store, entities) = nuisance_store(&[1.0, 2.0]);
    let binding = ValueGradientInterface::new(
        vec![FloatKey::NUISANCE, FloatKey::X],
        vec![entities[0], entities[1]],
    )
    .unwrap();
    let before = store.clone();

    let err = binding.set_values(&mut store, &[9.0, 9.0]).unwrap_err();
    assert!(matches!(err, HmcError::Store(_)));
    assert_eq!(store, before);
}

#[test]
fn optimized_variables_list_coordinates_before_nuisances() {
    let mut store = MemoryStore::new();
    let n = store.add_nuisance("sigma", 0.1, 1.0);
    let p = store.add_point("atom", [0.0, 0.0, 0.0], 1.0);
    let fixed = store.add_point("anchor", [0.0, 0.0, 0.0], 1.0);
    for key in FloatKey::xyz_keys() {
        store.set_is_optimized(key, fixed, false).unwrap();
    }

    let variables = OptimizedVariables::new(&store).unwrap();
    let binding = variables.interface();
    assert_eq!(binding.entity_indexes(), &[p, p, p, n]);
    assert_eq!(
        binding.float_keys(),
        &[FloatKey::X, FloatKey::Y, FloatKey::Z, FloatKey::NUISANCE]
    );
    assert_eq!(variables.names(&store)[3], "sigma_nuisance");
}

proptest! {
    #[test]
    fn wrong_length_leaves_store_untouched(
        values in prop::collection::vec(-10.0f64..10.0, 1..6),
        extra in 1usize..4,
        shorter in any::<bool>(),
    ) {
        let (mut store, entities) = nuisance_store(&values);
        let binding = ValueGradientInterface::new(
            vec![FloatKey::NUISANCE; entities.len()],
            entities,
        )
        .unwrap();
        prop_assert_eq!(binding.dimension(), values.len());

        let len = if shorter {
            values.len().saturating_sub(extra)
        } else {
            values.len() + extra
        };
        let x = vec![42.0; len];
        let before = store.clone();
        let err = binding.set_values(&mut store, &x).unwrap_err();
        prop_assert!(matches!(err, HmcError::Precondition(_)));
        prop_assert_eq!(store, before.clone());
        prop_assert_eq!(binding.get_values(&before).unwrap(), values);
    }
}
