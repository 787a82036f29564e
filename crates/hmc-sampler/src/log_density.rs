use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, HmcError, ScoringFunction};

use crate::accessor::ValueGradientInterface;
use crate::constraint::{JointConstraint, VariableConstraint};

/// Log-density view `log p(x) = −U(x)` of a scoring function over a binding.
///
/// Evaluating at `x` writes `x` into the store first, so the store ends up in
/// the evaluated state.
#[derive(Debug, Clone)]
pub struct LogDensity<F> {
    scoring: F,
    interface: ValueGradientInterface,
}

impl<F: ScoringFunction> LogDensity<F> {
    /// Wraps `scoring` evaluated over the variables bound by `interface`.
    pub fn new(scoring: F, interface: ValueGradientInterface) -> Self {
        Self { scoring, interface }
    }

    /// Dimension of `x`.
    pub fn get_dimension(&self) -> usize {
        self.interface.dimension()
    }

    /// The bound variables.
    pub fn interface(&self) -> &ValueGradientInterface {
        &self.interface
    }

    /// `−U(x)`.
    pub fn get_logpdf(&self, store: &mut dyn AttributeStore, x: &[f64]) -> Result<f64, HmcError> {
        self.interface.set_values(store, x)?;
        Ok(-self.scoring.evaluate(store, false)?)
    }

    /// `(−U(x), −∇U(x))`.
    pub fn get_logpdf_with_gradient(
        &self,
        store: &mut dyn AttributeStore,
        x: &[f64],
    ) -> Result<(f64, Vec<f64>), HmcError> {
        self.interface.set_values(store, x)?;
        let potential = self.scoring.evaluate(store, true)?;
        let gradient = self
            .interface
            .get_gradient(&*store)?
            .into_iter()
            .map(|g| -g)
            .collect();
        Ok((-potential, gradient))
    }
}

/// A [`LogDensity`] pushed forward to unconstrained coordinates `y`.
///
/// `log p(y) = log p(x(y)) + log |det ∂x/∂y|`, with the gradient chain-ruled
/// through the transform.
#[derive(Debug)]
pub struct TransformedLogDensity<F> {
    density: LogDensity<F>,
    transform: JointConstraint,
}

impl<F: ScoringFunction> TransformedLogDensity<F> {
    /// Wraps `density`; `transform` must cover exactly its dimension.
    pub fn new(density: LogDensity<F>, transform: JointConstraint) -> Result<Self, HmcError> {
        if transform.dimension() != density.get_dimension() {
            return Err(HmcError::Precondition(
                ErrorInfo::new(
                    "transform-dimension-mismatch",
                    "transform dimension must match the log-density dimension",
                )
                .with_context("transform", transform.dimension().to_string())
                .with_context("density", density.get_dimension().to_string()),
            ));
        }
        Ok(Self { density, transform })
    }

    /// Dimension of the unconstrained space.
    pub fn get_dimension(&self) -> usize {
        self.transform.dimension()
    }

    /// The transform from `y` to `x`.
    pub fn transform(&self) -> &JointConstraint {
        &self.transform
    }

    /// `log p(x(y)) + log |J(y)|`.
    pub fn get_logpdf(&self, store: &mut dyn AttributeStore, y: &[f64]) -> Result<f64, HmcError> {
        let x = self.transform.constrain_vec(y)?;
        let logpdf = self.density.get_logpdf(store, &x)?;
        Ok(logpdf + self.transform.log_jacobian(y))
    }

    /// Log-density in `y` and its gradient with respect to `y`.
    pub fn get_logpdf_with_gradient(
        &self,
        store: &mut dyn AttributeStore,
        y: &[f64],
    ) -> Result<(f64, Vec<f64>), HmcError> {
        let x = self.transform.constrain_vec(y)?;
        let (logpdf, grad_x) = self.density.get_logpdf_with_gradient(store, &x)?;
        let mut grad_y = vec![0.0; y.len()];
        self.transform.push_gradient(y, &grad_x, &mut grad_y);
        Ok((logpdf + self.transform.log_jacobian(y), grad_y))
    }
}
