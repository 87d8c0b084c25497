//! Quantile arrays and quantile extraction
//!
//! A [`QuantileArray`] is the compact description of a distribution the codec
//! works on: `M` non-decreasing values where element `i` sits at cumulative
//! probability `i / (M - 1)`. The first and last elements bound the support.
//!
//! # Sources
//!
//! - [`Histogram`]: a binned density on a uniform grid
//! - [`Samples`]: random draws from the distribution
//!
//! # Example
//!
//! ```
//! use pdfpack::quantiles::Histogram;
//! use pdfpack::traits::QuantileSource;
//!
//! let grid: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
//! // Flat between 0.1 and 0.3
//! let density: Vec<f64> = (0..=100)
//!     .map(|i| if (10..=30).contains(&i) { 1.0 } else { 0.0 })
//!     .collect();
//!
//! let histogram = Histogram::new(&grid, &density).unwrap();
//! let quantiles = histogram.quantiles(21).unwrap();
//! assert_eq!(quantiles.len(), 21);
//! assert!((quantiles.quantile_at(0.5) - 0.2).abs() < 1e-9);
//! ```

mod extract;

pub use extract::{Histogram, Samples};

use crate::error::QuantileError;
use crate::math;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Ordered quantile values at evenly spaced cumulative probabilities
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<f64>", into = "Vec<f64>")
)]
pub struct QuantileArray {
    values: Vec<f64>,
}

impl QuantileArray {
    /// Build a quantile array, checking length, finiteness and ordering
    pub fn new(values: Vec<f64>) -> Result<Self, QuantileError> {
        if values.len() < 2 {
            return Err(QuantileError::TooFewValues {
                count: values.len(),
            });
        }
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(QuantileError::NonFinite { index });
            }
            if index > 0 && value < values[index - 1] {
                return Err(QuantileError::NotMonotonic {
                    index,
                    value,
                    previous: values[index - 1],
                });
            }
        }
        Ok(Self { values })
    }

    /// Build from values that are non-decreasing up to rounding noise.
    ///
    /// Any element below its predecessor is lifted to it.
    pub(crate) fn from_monotone(mut values: Vec<f64>) -> Self {
        debug_assert!(values.len() >= 2);
        for i in 1..values.len() {
            if values[i] < values[i - 1] {
                values[i] = values[i - 1];
            }
        }
        Self { values }
    }

    /// Number of quantiles (`M`)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: a quantile array holds at least two values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The quantile values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume and return the quantile values
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Lower support bound (0th percentile)
    pub fn min(&self) -> f64 {
        self.values[0]
    }

    /// Upper support bound (100th percentile)
    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Spacing of the cumulative-probability knots, `1 / (M - 1)`
    pub fn knot_spacing(&self) -> f64 {
        1.0 / (self.values.len() - 1) as f64
    }

    /// Cumulative probability of every quantile: `linspace(0, 1, M)`
    pub fn knots(&self) -> Vec<f64> {
        math::linspace(0.0, 1.0, self.values.len())
    }

    /// Value below which a fraction `p` of the probability lies
    ///
    /// Linear between knots; `p` is clamped to `[0, 1]`.
    pub fn quantile_at(&self, p: f64) -> f64 {
        let values = &self.values;
        let last = values.len() - 1;
        if p.is_nan() {
            return f64::NAN;
        }
        if p <= 0.0 {
            return values[0];
        }
        if p >= 1.0 {
            return values[last];
        }

        // knot(j) <= p < knot(j + 1)
        let mut j = ((p / self.knot_spacing()) as usize).min(last - 1);
        while j > 0 && self.knot(j) > p {
            j -= 1;
        }
        while self.knot(j + 1) <= p {
            j += 1;
        }
        let (k0, k1) = (self.knot(j), self.knot(j + 1));
        let t = (p - k0) / (k1 - k0);
        values[j] + t * (values[j + 1] - values[j])
    }

    /// Cumulative probability at `z`
    ///
    /// Linear between quantiles, 0 below the support and 1 above it.
    pub fn cdf_at(&self, z: f64) -> f64 {
        let values = &self.values;
        let last = values.len() - 1;
        if z.is_nan() {
            return f64::NAN;
        }
        if z < values[0] {
            return 0.0;
        }
        if z >= values[last] {
            return 1.0;
        }

        // values[j] <= z < values[j + 1]; repeated values resolve to the last
        let j = values.partition_point(|&v| v <= z) - 1;
        let t = (z - values[j]) / (values[j + 1] - values[j]);
        let (k0, k1) = (self.knot(j), self.knot(j + 1));
        k0 + t * (k1 - k0)
    }

    /// Cumulative probability of quantile `i`, matching [`Self::knots`]
    #[inline]
    fn knot(&self, i: usize) -> f64 {
        if i + 1 == self.values.len() {
            1.0
        } else {
            self.knot_spacing() * i as f64
        }
    }
}

impl AsRef<[f64]> for QuantileArray {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl TryFrom<Vec<f64>> for QuantileArray {
    type Error = QuantileError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<QuantileArray> for Vec<f64> {
    fn from(quantiles: QuantileArray) -> Self {
        quantiles.values
    }
}
