#![deny(missing_docs)]
#![doc = "Core traits and data types for the HMC sampler: entity and attribute identifiers, the attribute store and scoring contracts, errors and deterministic randomness."]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod memory;
pub mod provenance;
pub mod rng;

pub use errors::{ErrorInfo, HmcError};
pub use memory::MemoryStore;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};

/// Identifier for an entity (particle, nuisance parameter, ...) in an [`AttributeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityIndex(u64);

impl EntityIndex {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Key naming a scalar attribute attached to an entity.
///
/// Raw values below [`FloatKey::FIRST_USER_KEY`] are reserved for the
/// well-known keys defined as associated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FloatKey(u32);

impl FloatKey {
    /// Cartesian x coordinate.
    pub const X: FloatKey = FloatKey(0);
    /// Cartesian y coordinate.
    pub const Y: FloatKey = FloatKey(1);
    /// Cartesian z coordinate.
    pub const Z: FloatKey = FloatKey(2);
    /// Generic scalar (nuisance) value.
    pub const NUISANCE: FloatKey = FloatKey(3);
    /// Mass of the entity.
    pub const MASS: FloatKey = FloatKey(4);
    /// Velocity along x.
    pub const VX: FloatKey = FloatKey(5);
    /// Velocity along y.
    pub const VY: FloatKey = FloatKey(6);
    /// Velocity along z.
    pub const VZ: FloatKey = FloatKey(7);
    /// Velocity of a nuisance value.
    pub const VNUISANCE: FloatKey = FloatKey(8);
    /// Radius of a sphere; kept positive when optimized.
    pub const RADIUS: FloatKey = FloatKey(9);
    /// Lower bound of a nuisance value.
    pub const NUISANCE_LOWER: FloatKey = FloatKey(10);
    /// Upper bound of a nuisance value.
    pub const NUISANCE_UPPER: FloatKey = FloatKey(11);
    /// First raw value available for caller-defined keys.
    pub const FIRST_USER_KEY: u32 = 16;

    /// Creates a key from its raw integer representation.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the key.
    pub fn as_raw(&self) -> u32 {
        self.0
    }

    /// The three Cartesian coordinate keys in x, y, z order.
    pub fn xyz_keys() -> [FloatKey; 3] {
        [FloatKey::X, FloatKey::Y, FloatKey::Z]
    }

    /// Human readable name of the key.
    pub fn name(&self) -> String {
        match self.0 {
            0 => "x".to_string(),
            1 => "y".to_string(),
            2 => "z".to_string(),
            3 => "nuisance".to_string(),
            4 => "mass".to_string(),
            5 => "vx".to_string(),
            6 => "vy".to_string(),
            7 => "vz".to_string(),
            8 => "vnuisance".to_string(),
            9 => "radius".to_string(),
            10 => "nuisance_lower".to_string(),
            11 => "nuisance_upper".to_string(),
            raw => format!("key{raw}"),
        }
    }
}

impl fmt::Display for FloatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Storage contract for scalar attributes and their derivatives.
///
/// Implementations own the state that the sampler reads and writes. Every
/// attribute carries a value, an accumulated derivative and an `optimized`
/// flag that marks it as a free parameter of the outer model.
pub trait AttributeStore {
    /// Returns every entity known to the store in a stable order.
    fn entities(&self) -> Vec<EntityIndex>;

    /// Returns a display name for the entity.
    fn entity_name(&self, entity: EntityIndex) -> String {
        entity.to_string()
    }

    /// Returns whether `entity` carries the attribute `key`.
    fn has_attribute(&self, key: FloatKey, entity: EntityIndex) -> bool;

    /// Adds a new attribute to an existing entity.
    fn add_attribute(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        value: f64,
        optimized: bool,
    ) -> Result<(), HmcError>;

    /// Reads the current value of an attribute.
    fn get_value(&self, key: FloatKey, entity: EntityIndex) -> Result<f64, HmcError>;

    /// Overwrites the value of an existing attribute.
    fn set_value(&mut self, key: FloatKey, entity: EntityIndex, value: f64)
        -> Result<(), HmcError>;

    /// Returns whether the attribute is an optimized (free) parameter.
    fn is_optimized(&self, key: FloatKey, entity: EntityIndex) -> bool;

    /// Reads the derivative accumulated for an attribute by the last scoring pass.
    fn get_derivative(&self, key: FloatKey, entity: EntityIndex) -> Result<f64, HmcError>;

    /// Adds `value` to the derivative of an attribute.
    fn add_to_derivative(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        value: f64,
    ) -> Result<(), HmcError>;

    /// Resets every derivative to zero.
    fn clear_derivatives(&mut self);
}

/// Potential-energy oracle evaluated against an [`AttributeStore`].
pub trait ScoringFunction {
    /// Returns the total potential energy of the store's current state.
    ///
    /// When `compute_derivatives` is set the oracle clears all derivatives and
    /// accumulates `dU/dattribute` into the store.
    fn evaluate(
        &self,
        store: &mut dyn AttributeStore,
        compute_derivatives: bool,
    ) -> Result<f64, HmcError>;
}

impl<T: ScoringFunction + ?Sized> ScoringFunction for &T {
    fn evaluate(
        &self,
        store: &mut dyn AttributeStore,
        compute_derivatives: bool,
    ) -> Result<f64, HmcError> {
        (**self).evaluate(store, compute_derivatives)
    }
}

impl<T: ScoringFunction + ?Sized> ScoringFunction for Box<T> {
    fn evaluate(
        &self,
        store: &mut dyn AttributeStore,
        compute_derivatives: bool,
    ) -> Result<f64, HmcError> {
        (**self).evaluate(store, compute_derivatives)
    }
}
