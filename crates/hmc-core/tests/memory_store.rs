use hmc_core::{AttributeStore, EntityIndex, FloatKey, HmcError, MemoryStore};

#[test]
fn points_carry_coordinates_and_fixed_mass() {
    let mut store = MemoryStore::new();
    let p = store.add_point("atom", [1.0, 2.0, 3.0], 12.0);

    assert_eq!(store.get_value(FloatKey::Y, p).unwrap(), 2.0);
    assert!(store.is_optimized(FloatKey::X, p));
    assert!(!store.is_optimized(FloatKey::MASS, p));
    assert_eq!(store.entity_name(p), "atom");
    assert_eq!(store.entities(), vec![p]);
}

#[test]
fn derivatives_accumulate_and_clear() {
    let mut store = MemoryStore::new();
    let n = store.add_nuisance("sigma", 0.5, 1.0);

    store.add_to_derivative(FloatKey::NUISANCE, n, 1.5).unwrap();
    store.add_to_derivative(FloatKey::NUISANCE, n, 0.5).unwrap();
    assert_eq!(store.get_derivative(FloatKey::NUISANCE, n).unwrap(), 2.0);

    store.clear_derivatives();
    assert_eq!(store.get_derivative(FloatKey::NUISANCE, n).unwrap(), 0.0);
}

#[test]
fn missing_attribute_is_a_store_error() {
    let mut store = MemoryStore::new();
    let n = store.add_nuisance("sigma", 0.5, 1.0);

    let err = store.get_value(FloatKey::X, n).unwrap_err();
    assert!(matches!(err, HmcError::Store(_)));
    assert_eq!(err.info().code, "missing-attribute");

    let err = store
        .set_value(FloatKey::NUISANCE, EntityIndex::from_raw(42), 1.0)
        .unwrap_err();
    assert!(matches!(err, HmcError::Store(_)));
}

#[test]
fn attributes_can_be_added_once() {
    let mut store = MemoryStore::new();
    let e = store.add_entity("bare");
    store.add_attribute(FloatKey::VX, e, 0.0, false).unwrap();
    assert!(store.has_attribute(FloatKey::VX, e));

    let err = store.add_attribute(FloatKey::VX, e, 1.0, false).unwrap_err();
    assert_eq!(err.info().code, "duplicate-attribute");

    let err = store
        .add_attribute(FloatKey::VX, EntityIndex::from_raw(9), 1.0, false)
        .unwrap_err();
    assert_eq!(err.info().code, "unknown-entity");
}

#[test]
fn key_names_are_stable() {
    assert_eq!(FloatKey::NUISANCE.name(), "nuisance");
    assert_eq!(FloatKey::VZ.to_string(), "vz");
    assert_eq!(FloatKey::from_raw(FloatKey::FIRST_USER_KEY).name(), "key16");
}
