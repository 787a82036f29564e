use hmc_core::{AttributeStore, EntityIndex, FloatKey};

/// Kind of dynamics variable an entity contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicsKind {
    /// Cartesian point with three coordinates.
    Positional,
    /// Single generic scalar (nuisance) value.
    Scalar,
}

impl DynamicsKind {
    /// Position keys integrated for this kind.
    pub fn position_keys(&self) -> &'static [FloatKey] {
        match self {
            DynamicsKind::Positional => &[FloatKey::X, FloatKey::Y, FloatKey::Z],
            DynamicsKind::Scalar => &[FloatKey::NUISANCE],
        }
    }

    /// Velocity keys paired with [`DynamicsKind::position_keys`].
    pub fn velocity_keys(&self) -> &'static [FloatKey] {
        match self {
            DynamicsKind::Positional => &[FloatKey::VX, FloatKey::VY, FloatKey::VZ],
            DynamicsKind::Scalar => &[FloatKey::VNUISANCE],
        }
    }

    /// Number of scalar components.
    pub fn components(&self) -> usize {
        self.position_keys().len()
    }
}

/// Decides which entities take part in dynamics.
pub trait EntityClassifier {
    /// Returns the dynamics kind of `entity`, or `None` when it must be excluded.
    fn classify(&self, store: &dyn AttributeStore, entity: EntityIndex) -> Option<DynamicsKind>;
}

/// Accepts Cartesian points and nuisance scalars carrying a fixed, finite,
/// strictly positive mass.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl EntityClassifier for StandardClassifier {
    fn classify(&self, store: &dyn AttributeStore, entity: EntityIndex) -> Option<DynamicsKind> {
        let kind = if FloatKey::xyz_keys()
            .iter()
            .all(|&key| store.has_attribute(key, entity))
        {
            DynamicsKind::Positional
        } else if store.has_attribute(FloatKey::NUISANCE, entity) {
            DynamicsKind::Scalar
        } else {
            return None;
        };

        if !store.has_attribute(FloatKey::MASS, entity)
            || store.is_optimized(FloatKey::MASS, entity)
        {
            return None;
        }
        let mass = store.get_value(FloatKey::MASS, entity).ok()?;
        (mass.is_finite() && mass > 0.0).then_some(kind)
    }
}

impl<T: EntityClassifier + ?Sized> EntityClassifier for Box<T> {
    fn classify(&self, store: &dyn AttributeStore, entity: EntityIndex) -> Option<DynamicsKind> {
        (**self).classify(store, entity)
    }
}
