use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, EntityIndex, FloatKey, HmcError};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::constraint::{
    transform_constraint, IdentityConstraint, JointConstraint, LowerBoundedConstraint,
    VariableConstraint,
};

/// Ordered view over `N` co-indexed (attribute key, entity) pairs.
///
/// Position `i` refers to the same pair for the lifetime of the binding. Values
/// and gradients are read fresh from the store on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueGradientInterface {
    keys: Vec<FloatKey>,
    entities: Vec<EntityIndex>,
}

impl ValueGradientInterface {
    /// Binds `keys[i]` to `entities[i]`; both lists must have the same length.
    pub fn new(keys: Vec<FloatKey>, entities: Vec<EntityIndex>) -> Result<Self, HmcError> {
        if keys.len() != entities.len() {
            return Err(HmcError::Precondition(
                ErrorInfo::new(
                    "binding-length-mismatch",
                    "number of entity indexes and float keys must be equal",
                )
                .with_context("keys", keys.len().to_string())
                .with_context("entities", entities.len().to_string()),
            ));
        }
        Ok(Self { keys, entities })
    }

    /// Builds the binding from a list of pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (FloatKey, EntityIndex)>) -> Self {
        let (keys, entities) = pairs.into_iter().unzip();
        Self { keys, entities }
    }

    /// Number of bound pairs.
    pub fn dimension(&self) -> usize {
        self.keys.len()
    }

    /// Bound attribute keys in binding order.
    pub fn float_keys(&self) -> &[FloatKey] {
        &self.keys
    }

    /// Bound entities in binding order.
    pub fn entity_indexes(&self) -> &[EntityIndex] {
        &self.entities
    }

    /// Iterates over the bound pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (FloatKey, EntityIndex)> + '_ {
        self.keys.iter().copied().zip(self.entities.iter().copied())
    }

    /// Reads the current value of every bound attribute.
    pub fn get_values(&self, store: &dyn AttributeStore) -> Result<Vec<f64>, HmcError> {
        self.pairs()
            .map(|(key, entity)| store.get_value(key, entity))
            .collect()
    }

    /// Writes `x` back to the store.
    ///
    /// Nothing is written unless `x` has exactly `dimension()` entries and every
    /// bound attribute exists.
    pub fn set_values(&self, store: &mut dyn AttributeStore, x: &[f64]) -> Result<(), HmcError> {
        if x.len() != self.dimension() {
            return Err(HmcError::Precondition(
                ErrorInfo::new(
                    "value-length-mismatch",
                    "position vector must be same length as entity indexes",
                )
                .with_context("expected", self.dimension().to_string())
                .with_context("actual", x.len().to_string()),
            ));
        }
        if let Some((key, entity)) = self
            .pairs()
            .find(|&(key, entity)| !store.has_attribute(key, entity))
        {
            return Err(HmcError::Store(
                ErrorInfo::new("missing-attribute", "bound attribute is absent from the store")
                    .with_context("key", key.name())
                    .with_context("entity", entity.to_string()),
            ));
        }
        for ((key, entity), &value) in self.pairs().zip(x) {
            store.set_value(key, entity, value)?;
        }
        Ok(())
    }

    /// Reads the derivative accumulated for every bound attribute.
    pub fn get_gradient(&self, store: &dyn AttributeStore) -> Result<Vec<f64>, HmcError> {
        self.pairs()
            .map(|(key, entity)| store.get_derivative(key, entity))
            .collect()
    }

    /// Entities read by the binding, deduplicated in first-seen order.
    pub fn inputs(&self) -> Vec<EntityIndex> {
        let mut seen = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            if !seen.contains(entity) {
                seen.push(*entity);
            }
        }
        seen
    }

    /// The binding produces no derived outputs.
    pub fn outputs(&self) -> Vec<EntityIndex> {
        Vec::new()
    }

    /// Column names of the form `{entity name}_{key name}`.
    pub fn names(&self, store: &dyn AttributeStore) -> Vec<String> {
        self.pairs()
            .map(|(key, entity)| format!("{}_{}", store.entity_name(entity), key.name()))
            .collect()
    }
}

/// Discovers the optimized variables of a store, binds them and builds the
/// transform mapping them onto an unconstrained space.
///
/// Variables are grouped by kind and, within a kind, listed in entity order:
/// Cartesian coordinates (identity transform, one block per entity), radii
/// (bounded below by zero), then nuisances (bounded by their optional
/// `NUISANCE_LOWER`/`NUISANCE_UPPER` attributes). Only optimized attributes are
/// included.
#[derive(Debug)]
pub struct OptimizedVariables {
    interface: ValueGradientInterface,
    transformation: JointConstraint,
}

impl OptimizedVariables {
    /// Scans `store` for optimized coordinate, radius and nuisance attributes.
    pub fn new(store: &dyn AttributeStore) -> Result<Self, HmcError> {
        let entities = store.entities();
        let optimized = |key: FloatKey, entity: EntityIndex| {
            store.has_attribute(key, entity) && store.is_optimized(key, entity)
        };
        let mut pairs = Vec::new();
        let mut transformation = JointConstraint::new();

        for &entity in &entities {
            let keys: Vec<FloatKey> = FloatKey::xyz_keys()
                .into_iter()
                .filter(|&key| optimized(key, entity))
                .collect();
            if !keys.is_empty() {
                transformation.push(Box::new(IdentityConstraint::new(keys.len())));
                pairs.extend(keys.into_iter().map(|key| (key, entity)));
            }
        }
        for &entity in &entities {
            if optimized(FloatKey::RADIUS, entity) {
                transformation.push(Box::new(LowerBoundedConstraint::new(0.0)));
                pairs.push((FloatKey::RADIUS, entity));
            }
        }
        for &entity in &entities {
            if optimized(FloatKey::NUISANCE, entity) {
                let bound = |key: FloatKey| {
                    if store.has_attribute(key, entity) {
                        store.get_value(key, entity).map(Some)
                    } else {
                        Ok(None)
                    }
                };
                let lower = bound(FloatKey::NUISANCE_LOWER)?;
                let upper = bound(FloatKey::NUISANCE_UPPER)?;
                let constraint = transform_constraint(lower, upper).map_err(|err| match err {
                    HmcError::Precondition(info) => HmcError::Precondition(
                        info.with_context("entity", store.entity_name(entity)),
                    ),
                    other => other,
                })?;
                transformation.push(constraint);
                pairs.push((FloatKey::NUISANCE, entity));
            }
        }

        Ok(Self {
            interface: ValueGradientInterface::from_pairs(pairs),
            transformation,
        })
    }

    /// The binding over every optimized variable.
    pub fn interface(&self) -> &ValueGradientInterface {
        &self.interface
    }

    /// Transform from unconstrained space onto the bound variables, co-indexed
    /// with [`OptimizedVariables::interface`].
    pub fn transformation(&self) -> &JointConstraint {
        &self.transformation
    }

    /// Consumes the discovery result, keeping only the binding.
    pub fn into_interface(self) -> ValueGradientInterface {
        self.interface
    }

    /// Consumes the discovery result into the binding and its transform.
    pub fn into_parts(self) -> (ValueGradientInterface, JointConstraint) {
        (self.interface, self.transformation)
    }

    /// Column names for the bound variables.
    pub fn names(&self, store: &dyn AttributeStore) -> Vec<String> {
        self.interface.names(store)
    }

    /// Moves every variable to a random point of its support.
    ///
    /// Draws `y ~ N(0, I)` in unconstrained space and writes the constrained
    /// image through the binding.
    pub fn shuffle<R: Rng + ?Sized>(
        &self,
        store: &mut dyn AttributeStore,
        rng: &mut R,
    ) -> Result<(), HmcError> {
        let y: Vec<f64> = (0..self.transformation.dimension())
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        let x = self.transformation.constrain_vec(&y)?;
        self.interface.set_values(store, &x)
    }
}
