//! Core traits
//!
//! [`QuantileSource`] is the seam between a raw distribution and the codec:
//! the adaptive search asks a source for as many quantiles as it wants to try.
//! [`Interpolant`] is the seam between a quantile table and the continuous
//! curve drawn through it.

use crate::error::QuantileError;
use crate::quantiles::QuantileArray;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A distribution the codec can draw quantiles from
pub trait QuantileSource {
    /// Extract `count` quantiles covering the 0th to 100th percentile
    fn quantiles(&self, count: usize) -> Result<QuantileArray, QuantileError>;

    /// Whether the source carries any probability mass at all
    fn has_mass(&self) -> bool;
}

impl<T: QuantileSource + ?Sized> QuantileSource for &T {
    fn quantiles(&self, count: usize) -> Result<QuantileArray, QuantileError> {
        (**self).quantiles(count)
    }

    fn has_mass(&self) -> bool {
        (**self).has_mass()
    }
}

/// A one-dimensional curve through a table of knots
pub trait Interpolant {
    /// Value of the curve at `x`
    ///
    /// Outside the knot range the curve is clamped to its end values.
    fn evaluate(&self, x: f64) -> f64;

    /// First derivative of the curve at `x` (zero outside the knot range)
    fn evaluate_derivative(&self, x: f64) -> f64;

    /// Evaluate at many points at once
    fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}
