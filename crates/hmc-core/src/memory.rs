//! In-memory [`AttributeStore`] backed by ordered maps.

use std::collections::BTreeMap;

use crate::errors::{ErrorInfo, HmcError};
use crate::{AttributeStore, EntityIndex, FloatKey};

#[derive(Debug, Clone, PartialEq)]
struct Attribute {
    value: f64,
    derivative: f64,
    optimized: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct EntityRecord {
    name: String,
    attributes: BTreeMap<FloatKey, Attribute>,
}

/// Reference attribute store keeping every entity in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entities: BTreeMap<EntityIndex, EntityRecord>,
    next_index: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new entity without attributes and returns its index.
    pub fn add_entity(&mut self, name: impl Into<String>) -> EntityIndex {
        let index = EntityIndex::from_raw(self.next_index);
        self.next_index += 1;
        self.entities.insert(
            index,
            EntityRecord {
                name: name.into(),
                attributes: BTreeMap::new(),
            },
        );
        index
    }

    /// Adds a 3-D point with optimized coordinates and a fixed mass.
    pub fn add_point(&mut self, name: impl Into<String>, xyz: [f64; 3], mass: f64) -> EntityIndex {
        let index = self.add_entity(name);
        let record = self.record_mut_unchecked(index);
        for (key, value) in FloatKey::xyz_keys().into_iter().zip(xyz) {
            record.attributes.insert(key, Attribute::new(value, true));
        }
        record
            .attributes
            .insert(FloatKey::MASS, Attribute::new(mass, false));
        index
    }

    /// Adds an optimized nuisance scalar with a fixed mass.
    pub fn add_nuisance(&mut self, name: impl Into<String>, value: f64, mass: f64) -> EntityIndex {
        let index = self.add_entity(name);
        let record = self.record_mut_unchecked(index);
        record
            .attributes
            .insert(FloatKey::NUISANCE, Attribute::new(value, true));
        record
            .attributes
            .insert(FloatKey::MASS, Attribute::new(mass, false));
        index
    }

    /// Marks an existing attribute as optimized or fixed.
    pub fn set_is_optimized(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        optimized: bool,
    ) -> Result<(), HmcError> {
        self.attribute_mut(key, entity)?.optimized = optimized;
        Ok(())
    }

    /// Number of entities in the store.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true when the store holds no entity.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn record_mut_unchecked(&mut self, entity: EntityIndex) -> &mut EntityRecord {
        self.entities
            .entry(entity)
            .or_insert_with(|| EntityRecord {
                name: entity.to_string(),
                attributes: BTreeMap::new(),
            })
    }

    fn attribute(&self, key: FloatKey, entity: EntityIndex) -> Result<&Attribute, HmcError> {
        self.entities
            .get(&entity)
            .and_then(|record| record.attributes.get(&key))
            .ok_or_else(|| missing_attribute(key, entity))
    }

    fn attribute_mut(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
    ) -> Result<&mut Attribute, HmcError> {
        self.entities
            .get_mut(&entity)
            .and_then(|record| record.attributes.get_mut(&key))
            .ok_or_else(|| missing_attribute(key, entity))
    }
}

impl Attribute {
    fn new(value: f64, optimized: bool) -> Self {
        Self {
            value,
            derivative: 0.0,
            optimized,
        }
    }
}

fn missing_attribute(key: FloatKey, entity: EntityIndex) -> HmcError {
    HmcError::Store(
        ErrorInfo::new("missing-attribute", "entity does not carry the requested attribute")
            .with_context("key", key.name())
            .with_context("entity", entity.to_string()),
    )
}

impl AttributeStore for MemoryStore {
    fn entities(&self) -> Vec<EntityIndex> {
        self.entities.keys().copied().collect()
    }

    fn entity_name(&self, entity: EntityIndex) -> String {
        self.entities
            .get(&entity)
            .map(|record| record.name.clone())
            .unwrap_or_else(|| entity.to_string())
    }

    fn has_attribute(&self, key: FloatKey, entity: EntityIndex) -> bool {
        self.entities
            .get(&entity)
            .map(|record| record.attributes.contains_key(&key))
            .unwrap_or(false)
    }

    fn add_attribute(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        value: f64,
        optimized: bool,
    ) -> Result<(), HmcError> {
        let Some(record) = self.entities.get_mut(&entity) else {
            return Err(HmcError::Store(
                ErrorInfo::new("unknown-entity", "entity is not registered in the store")
                    .with_context("entity", entity.to_string()),
            ));
        };
        if record.attributes.contains_key(&key) {
            return Err(HmcError::Store(
                ErrorInfo::new("duplicate-attribute", "attribute already present")
                    .with_context("key", key.name())
                    .with_context("entity", entity.to_string()),
            ));
        }
        record.attributes.insert(key, Attribute::new(value, optimized));
        Ok(())
    }

    fn get_value(&self, key: FloatKey, entity: EntityIndex) -> Result<f64, HmcError> {
        self.attribute(key, entity).map(|attr| attr.value)
    }

    fn set_value(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        value: f64,
    ) -> Result<(), HmcError> {
        self.attribute_mut(key, entity)?.value = value;
        Ok(())
    }

    fn is_optimized(&self, key: FloatKey, entity: EntityIndex) -> bool {
        self.attribute(key, entity)
            .map(|attr| attr.optimized)
            .unwrap_or(false)
    }

    fn get_derivative(&self, key: FloatKey, entity: EntityIndex) -> Result<f64, HmcError> {
        self.attribute(key, entity).map(|attr| attr.derivative)
    }

    fn add_to_derivative(
        &mut self,
        key: FloatKey,
        entity: EntityIndex,
        value: f64,
    ) -> Result<(), HmcError> {
        self.attribute_mut(key, entity)?.derivative += value;
        Ok(())
    }

    fn clear_derivatives(&mut self) {
        for record in self.entities.values_mut() {
            for attr in record.attributes.values_mut() {
                attr.derivative = 0.0;
            }
        }
    }
}
