//! Quantile extraction from binned densities and from random samples

use super::QuantileArray;
use crate::error::QuantileError;
use crate::math;
use crate::traits::QuantileSource;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[inline]
fn has_density(p: f64) -> bool {
    p.is_finite() && p > 0.0
}

/// A binned density on a uniformly spaced grid of bin centers
///
/// # Example
///
/// ```
/// use pdfpack::quantiles::Histogram;
/// use pdfpack::traits::QuantileSource;
///
/// let grid = [0.0, 0.1, 0.2, 0.3];
/// let density = [0.0, 1.0, 1.0, 0.0];
///
/// let q = Histogram::new(&grid, &density).unwrap().quantiles(3).unwrap();
/// assert!((q.min() - 0.05).abs() < 1e-12);
/// assert!((q.max() - 0.25).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Histogram<'a> {
    grid: &'a [f64],
    density: &'a [f64],
}

impl<'a> Histogram<'a> {
    /// Wrap a grid of bin centers and the density in each bin
    ///
    /// The grid must hold at least two increasing points and match the
    /// density in length. Non-finite or negative densities count as empty bins.
    pub fn new(grid: &'a [f64], density: &'a [f64]) -> Result<Self, QuantileError> {
        let invalid = || QuantileError::InvalidGrid {
            grid_len: grid.len(),
            density_len: density.len(),
        };
        if grid.len() < 2 || grid.len() != density.len() {
            return Err(invalid());
        }
        let dz = grid[1] - grid[0];
        if !(dz.is_finite() && dz > 0.0) {
            return Err(invalid());
        }
        Ok(Self { grid, density })
    }

    /// Bin centers
    pub fn grid(&self) -> &'a [f64] {
        self.grid
    }

    /// Density per bin
    pub fn density(&self) -> &'a [f64] {
        self.density
    }

    /// Total probability mass, `sum(p) * dz`
    pub fn total_mass(&self) -> f64 {
        let dz = self.grid[1] - self.grid[0];
        self.density
            .iter()
            .filter(|&&p| has_density(p))
            .sum::<f64>()
            * dz
    }
}

impl QuantileSource for Histogram<'_> {
    fn quantiles(&self, count: usize) -> Result<QuantileArray, QuantileError> {
        if count < 2 {
            return Err(QuantileError::InvalidQuantileCount { requested: count });
        }

        let first = self
            .density
            .iter()
            .position(|&p| has_density(p))
            .ok_or(QuantileError::DegenerateDistribution)?;
        let last = self
            .density
            .iter()
            .rposition(|&p| has_density(p))
            .ok_or(QuantileError::DegenerateDistribution)?;

        if first == last {
            // A single occupied bin is treated as a delta spread over its width
            let dz = self.grid[1] - self.grid[0];
            let center = self.grid[first];
            let values = math::linspace(center - dz / 2.0, center + dz / 2.0, count);
            return Ok(QuantileArray::from_monotone(values));
        }

        let grid = &self.grid[first..=last];
        let density = &self.density[first..=last];
        let dz = grid[1] - grid[0];

        let mut edges = Vec::with_capacity(grid.len() + 1);
        edges.push(grid[0] - dz / 2.0);
        edges.extend(grid.iter().map(|&z| z + dz / 2.0));

        // CDF at bin edges, accumulated bin by bin
        let mut cdf = Vec::with_capacity(edges.len());
        cdf.push(0.0);
        let mut running = 0.0;
        for &p in density {
            if has_density(p) {
                running += p * dz;
            }
            cdf.push(running);
        }
        for c in cdf.iter_mut() {
            *c /= running;
        }
        let n = cdf.len();
        cdf[n - 1] = 1.0;

        let values = math::linspace(0.0, 1.0, count)
            .into_iter()
            .map(|target| math::interp(target, &cdf, &edges))
            .collect();
        Ok(QuantileArray::from_monotone(values))
    }

    fn has_mass(&self) -> bool {
        self.density.iter().any(|&p| has_density(p))
    }
}

/// Random draws from a distribution
///
/// Non-finite draws are ignored.
///
/// # Example
///
/// ```
/// use pdfpack::quantiles::Samples;
/// use pdfpack::traits::QuantileSource;
///
/// let draws = [0.3, f64::NAN, 0.1, 0.2, 0.5, 0.4];
/// let q = Samples::new(&draws).quantiles(3).unwrap();
/// assert_eq!(q.values(), &[0.1, 0.3, 0.5]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Samples<'a> {
    values: &'a [f64],
}

impl<'a> Samples<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self { values }
    }

    /// Number of finite draws
    pub fn finite_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }
}

impl QuantileSource for Samples<'_> {
    fn quantiles(&self, count: usize) -> Result<QuantileArray, QuantileError> {
        if count < 2 {
            return Err(QuantileError::InvalidQuantileCount { requested: count });
        }

        let mut sorted: Vec<f64> = self
            .values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if sorted.is_empty() {
            return Err(QuantileError::DegenerateDistribution);
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        // Linear interpolation between order statistics (Hyndman & Fan type 7)
        let n = sorted.len();
        let values = math::linspace(0.0, 1.0, count)
            .into_iter()
            .map(|p| {
                let h = (n - 1) as f64 * p;
                let j = math::floor(h) as usize;
                if j + 1 >= n {
                    return sorted[n - 1];
                }
                let g = h - j as f64;
                sorted[j] + g * (sorted[j + 1] - sorted[j])
            })
            .collect();
        Ok(QuantileArray::from_monotone(values))
    }

    fn has_mass(&self) -> bool {
        self.values.iter().any(|v| v.is_finite())
    }
}
