use std::fmt;

use hmc_core::errors::ErrorInfo;
use hmc_core::HmcError;

/// Bijection between unconstrained values `y ∈ ℝⁿ` and the support of a
/// group of constrained variables `x`.
///
/// Slices passed to every method hold exactly [`VariableConstraint::dimension`]
/// entries; [`JointConstraint`] takes care of splitting longer vectors.
pub trait VariableConstraint: fmt::Debug {
    /// Number of values handled, identical in both spaces.
    fn dimension(&self) -> usize;

    /// Maps `y` onto the support and writes the result into `x`.
    fn constrain(&self, y: &[f64], x: &mut [f64]);

    /// Inverse of [`VariableConstraint::constrain`]; fails when `x` is outside the support.
    fn unconstrain(&self, x: &[f64], y: &mut [f64]) -> Result<(), HmcError>;

    /// `log |det ∂x/∂y|` at `y`.
    fn log_jacobian(&self, y: &[f64]) -> f64;

    /// Writes `∇_y [f(x(y)) + log |det ∂x/∂y|]` into `grad_y`, given `grad_x = ∇_x f`.
    fn push_gradient(&self, y: &[f64], grad_x: &[f64], grad_y: &mut [f64]);
}

/// Unconstrained variables: `x = y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityConstraint {
    dimension: usize,
}

impl IdentityConstraint {
    /// Identity over `dimension` values.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl VariableConstraint for IdentityConstraint {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn constrain(&self, y: &[f64], x: &mut [f64]) {
        x.copy_from_slice(y);
    }

    fn unconstrain(&self, x: &[f64], y: &mut [f64]) -> Result<(), HmcError> {
        y.copy_from_slice(x);
        Ok(())
    }

    fn log_jacobian(&self, _y: &[f64]) -> f64 {
        0.0
    }

    fn push_gradient(&self, _y: &[f64], grad_x: &[f64], grad_y: &mut [f64]) {
        grad_y.copy_from_slice(grad_x);
    }
}

/// Scalar bounded from below: `x = lower + exp(y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowerBoundedConstraint {
    lower: f64,
}

impl LowerBoundedConstraint {
    /// Support `(lower, ∞)`.
    pub fn new(lower: f64) -> Self {
        Self { lower }
    }
}

impl VariableConstraint for LowerBoundedConstraint {
    fn dimension(&self) -> usize {
        1
    }

    fn constrain(&self, y: &[f64], x: &mut [f64]) {
        x[0] = self.lower + y[0].exp();
    }

    fn unconstrain(&self, x: &[f64], y: &mut [f64]) -> Result<(), HmcError> {
        if !(x[0] > self.lower) {
            return Err(outside_support(x[0], self.lower, f64::INFINITY));
        }
        y[0] = (x[0] - self.lower).ln();
        Ok(())
    }

    fn log_jacobian(&self, y: &[f64]) -> f64 {
        y[0]
    }

    fn push_gradient(&self, y: &[f64], grad_x: &[f64], grad_y: &mut [f64]) {
        grad_y[0] = grad_x[0] * y[0].exp() + 1.0;
    }
}

/// Scalar bounded from above: `x = upper − exp(y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperBoundedConstraint {
    upper: f64,
}

impl UpperBoundedConstraint {
    /// Support `(−∞, upper)`.
    pub fn new(upper: f64) -> Self {
        Self { upper }
    }
}

impl VariableConstraint for UpperBoundedConstraint {
    fn dimension(&self) -> usize {
        1
    }

    fn constrain(&self, y: &[f64], x: &mut [f64]) {
        x[0] = self.upper - y[0].exp();
    }

    fn unconstrain(&self, x: &[f64], y: &mut [f64]) -> Result<(), HmcError> {
        if !(x[0] < self.upper) {
            return Err(outside_support(x[0], f64::NEG_INFINITY, self.upper));
        }
        y[0] = (self.upper - x[0]).ln();
        Ok(())
    }

    fn log_jacobian(&self, y: &[f64]) -> f64 {
        y[0]
    }

    fn push_gradient(&self, y: &[f64], grad_x: &[f64], grad_y: &mut [f64]) {
        grad_y[0] = -grad_x[0] * y[0].exp() + 1.0;
    }
}

/// Scalar in `(lower, upper)` through the logistic function:
/// `x = lower + (upper − lower) σ(y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedConstraint {
    lower: f64,
    upper: f64,
}

impl BoundedConstraint {
    /// Both bounds must be finite with `lower < upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, HmcError> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(invalid_bounds(lower, upper));
        }
        Ok(Self { lower, upper })
    }

    fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl VariableConstraint for BoundedConstraint {
    fn dimension(&self) -> usize {
        1
    }

    fn constrain(&self, y: &[f64], x: &mut [f64]) {
        x[0] = self.lower + self.width() * sigmoid(y[0]);
    }

    fn unconstrain(&self, x: &[f64], y: &mut [f64]) -> Result<(), HmcError> {
        if !(x[0] > self.lower && x[0] < self.upper) {
            return Err(outside_support(x[0], self.lower, self.upper));
        }
        let p = (x[0] - self.lower) / self.width();
        y[0] = (p / (1.0 - p)).ln();
        Ok(())
    }

    fn log_jacobian(&self, y: &[f64]) -> f64 {
        self.width().ln() + log_sigmoid(y[0]) + log_sigmoid(-y[0])
    }

    fn push_gradient(&self, y: &[f64], grad_x: &[f64], grad_y: &mut [f64]) {
        let s = sigmoid(y[0]);
        grad_y[0] = grad_x[0] * self.width() * s * (1.0 - s) + (1.0 - 2.0 * s);
    }
}

/// Picks the transform matching the finite bounds of a scalar.
///
/// Missing or infinite bounds leave that side open; a NaN bound or an empty
/// interval is rejected.
pub fn transform_constraint(
    lower: Option<f64>,
    upper: Option<f64>,
) -> Result<Box<dyn VariableConstraint>, HmcError> {
    let lower = lower.unwrap_or(f64::NEG_INFINITY);
    let upper = upper.unwrap_or(f64::INFINITY);
    if lower.is_nan() || upper.is_nan() || lower >= upper {
        return Err(invalid_bounds(lower, upper));
    }
    let constraint: Box<dyn VariableConstraint> = match (lower.is_finite(), upper.is_finite()) {
        (true, true) => Box::new(BoundedConstraint::new(lower, upper)?),
        (true, false) => Box::new(LowerBoundedConstraint::new(lower)),
        (false, true) => Box::new(UpperBoundedConstraint::new(upper)),
        (false, false) => Box::new(IdentityConstraint::new(1)),
    };
    Ok(constraint)
}

/// Concatenation of constraints over consecutive blocks of a vector.
#[derive(Debug, Default)]
pub struct JointConstraint {
    parts: Vec<Box<dyn VariableConstraint>>,
}

impl JointConstraint {
    /// Creates an empty joint constraint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block.
    pub fn push(&mut self, part: Box<dyn VariableConstraint>) {
        self.parts.push(part);
    }

    /// Blocks in vector order.
    pub fn parts(&self) -> &[Box<dyn VariableConstraint>] {
        &self.parts
    }

    /// Constrains a full vector, checking its length first.
    pub fn constrain_vec(&self, y: &[f64]) -> Result<Vec<f64>, HmcError> {
        self.check_len(y.len())?;
        let mut x = vec![0.0; y.len()];
        self.constrain(y, &mut x);
        Ok(x)
    }

    /// Unconstrains a full vector, checking its length first.
    pub fn unconstrain_vec(&self, x: &[f64]) -> Result<Vec<f64>, HmcError> {
        self.check_len(x.len())?;
        let mut y = vec![0.0; x.len()];
        self.unconstrain(x, &mut y)?;
        Ok(y)
    }

    /// Fails unless `len` equals the joint dimension.
    pub fn check_len(&self, len: usize) -> Result<(), HmcError> {
        if len != self.dimension() {
            return Err(HmcError::Precondition(
                ErrorInfo::new(
                    "constraint-length-mismatch",
                    "vector length must match the constraint dimension",
                )
                .with_context("expected", self.dimension().to_string())
                .with_context("actual", len.to_string()),
            ));
        }
        Ok(())
    }

    fn blocks(&self) -> impl Iterator<Item = (&dyn VariableConstraint, std::ops::Range<usize>)> + '_ {
        let mut start = 0;
        self.parts.iter().map(move |part| {
            let end = start + part.dimension();
            let range = start..end;
            start = end;
            (part.as_ref(), range)
        })
    }
}

impl VariableConstraint for JointConstraint {
    fn dimension(&self) -> usize {
        self.parts.iter().map(|part| part.dimension()).sum()
    }

    fn constrain(&self, y: &[f64], x: &mut [f64]) {
        for (part, range) in self.blocks() {
            part.constrain(&y[range.clone()], &mut x[range]);
        }
    }

    fn unconstrain(&self, x: &[f64], y: &mut [f64]) -> Result<(), HmcError> {
        for (part, range) in self.blocks() {
            part.unconstrain(&x[range.clone()], &mut y[range])?;
        }
        Ok(())
    }

    fn log_jacobian(&self, y: &[f64]) -> f64 {
        self.blocks()
            .map(|(part, range)| part.log_jacobian(&y[range]))
            .sum()
    }

    fn push_gradient(&self, y: &[f64], grad_x: &[f64], grad_y: &mut [f64]) {
        for (part, range) in self.blocks() {
            part.push_gradient(&y[range.clone()], &grad_x[range.clone()], &mut grad_y[range]);
        }
    }
}

fn sigmoid(y: f64) -> f64 {
    if y >= 0.0 {
        1.0 / (1.0 + (-y).exp())
    } else {
        let e = y.exp();
        e / (1.0 + e)
    }
}

/// `log σ(y) = −softplus(−y)`.
fn log_sigmoid(y: f64) -> f64 {
    let z = -y;
    -(z.max(0.0) + (-z.abs()).exp().ln_1p())
}

fn invalid_bounds(lower: f64, upper: f64) -> HmcError {
    HmcError::Precondition(
        ErrorInfo::new("invalid-bounds", "lower bound must be below upper bound")
            .with_context("lower", lower.to_string())
            .with_context("upper", upper.to_string()),
    )
}

fn outside_support(x: f64, lower: f64, upper: f64) -> HmcError {
    HmcError::Precondition(
        ErrorInfo::new("outside-support", "value lies outside the constraint support")
            .with_context("value", x.to_string())
            .with_context("lower", lower.to_string())
            .with_context("upper", upper.to_string()),
    )
}
