//! Binned densities reconstructed from quantiles

use super::interp::{Interpolation, MonotoneSpline};
use crate::error::ReconstructError;
use crate::math;
use crate::quantiles::QuantileArray;
use crate::traits::Interpolant;
use tracing::warn;

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Slack on the range check so a support that ends exactly on a bin edge fits
const RANGE_SLACK: f64 = 1e-10;
/// Half-width added around a delta-like support when only a bin count is given
const DEGENERATE_HALF_RANGE: f64 = 0.01;
/// Width of the empty steps framing a stepwise density
const STEP_PADDING: f64 = 0.001;
/// Keeps the stepwise density finite across repeated quantiles
const STEP_WIDTH_FLOOR: f64 = 1e-9;

/// Target grid of bin centers
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridSpec {
    /// Caller-supplied, uniformly spaced bin centers
    Explicit(Vec<f64>),
    /// Bins of width `step`; missing bounds are taken from the quantile
    /// support and snapped outward to multiples of `step`
    Step {
        step: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// `count` bins from `min` to `max`; missing bounds are the quantile support
    Bins {
        count: usize,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl GridSpec {
    /// Bins of width `step` spanning the support
    pub fn step(step: f64) -> Self {
        GridSpec::Step {
            step,
            min: None,
            max: None,
        }
    }

    /// `count` bins spanning the support
    pub fn bins(count: usize) -> Self {
        GridSpec::Bins {
            count,
            min: None,
            max: None,
        }
    }

    /// Whether the caller fixed the grid range, so truncating to it means something
    pub fn has_explicit_bounds(&self) -> bool {
        match self {
            GridSpec::Explicit(_) => true,
            GridSpec::Step { min, max, .. } | GridSpec::Bins { min, max, .. } => {
                min.is_some() || max.is_some()
            }
        }
    }

    /// Bin centers for `quantiles`
    pub fn resolve(&self, quantiles: &QuantileArray) -> Result<Vec<f64>, ReconstructError> {
        let grid = match self {
            GridSpec::Explicit(grid) => grid.clone(),
            GridSpec::Step { step, min, max } => {
                let step = *step;
                if !(step.is_finite() && step > 0.0) {
                    return Err(ReconstructError::InvalidGrid {
                        reason: "step must be finite and positive",
                    });
                }
                let mut lo = min.unwrap_or_else(|| step * math::floor(quantiles.min() / step));
                let mut hi = max.unwrap_or_else(|| step * math::ceil(quantiles.max() / step));
                if lo == hi {
                    lo -= step;
                    hi += step;
                }
                let n = math::arange_len(lo, hi + step / 2.0, step);
                (0..n).map(|i| lo + step * i as f64).collect()
            }
            GridSpec::Bins { count, min, max } => {
                let mut lo = min.unwrap_or(quantiles.min());
                let mut hi = max.unwrap_or(quantiles.max());
                if lo == hi {
                    lo -= DEGENERATE_HALF_RANGE;
                    hi += DEGENERATE_HALF_RANGE;
                }
                if !(lo < hi) {
                    return Err(ReconstructError::InvalidGrid {
                        reason: "grid minimum must lie below its maximum",
                    });
                }
                math::linspace(lo, hi, *count)
            }
        };

        if grid.len() < 2 {
            return Err(ReconstructError::InvalidGrid {
                reason: "grid needs at least 2 points",
            });
        }
        let dz = grid[1] - grid[0];
        if !(dz.is_finite() && dz > 0.0) {
            return Err(ReconstructError::InvalidGrid {
                reason: "grid must be increasing",
            });
        }
        Ok(grid)
    }
}

impl From<Vec<f64>> for GridSpec {
    fn from(grid: Vec<f64>) -> Self {
        GridSpec::Explicit(grid)
    }
}

/// Reconstruction settings
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconstructOptions {
    pub method: Interpolation,
    /// Truncate a support wider than the grid instead of failing
    pub force_range: bool,
}

impl ReconstructOptions {
    pub fn with_method(mut self, method: Interpolation) -> Self {
        self.method = method;
        self
    }

    pub fn with_force_range(mut self, force_range: bool) -> Self {
        self.force_range = force_range;
        self
    }
}

/// A density on a grid of bin centers
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinnedPdf {
    pub grid: Vec<f64>,
    /// Density per bin, integrating to 1 over the grid
    pub density: Vec<f64>,
}

impl BinnedPdf {
    /// Bin width
    pub fn bin_width(&self) -> f64 {
        self.grid[1] - self.grid[0]
    }

    /// `sum(density) * dz`
    pub fn total_mass(&self) -> f64 {
        self.density.iter().sum::<f64>() * self.bin_width()
    }
}

/// CDF of `quantiles` at `points`
///
/// 0 below the support and 1 above it. The spline curve is scaled to end at
/// exactly 1 on the largest quantile and kept within `[0, 1]`.
pub fn to_cdf(quantiles: &QuantileArray, points: &[f64], method: Interpolation) -> Vec<f64> {
    match method {
        Interpolation::Linear => points.iter().map(|&z| quantiles.cdf_at(z)).collect(),
        Interpolation::Spline => {
            let curve = MonotoneSpline::new(quantiles.values(), &quantiles.knots());
            let (lo, hi) = (quantiles.min(), quantiles.max());
            // Rescale so the curve reaches exactly 1 at the top of the support
            let top = curve.evaluate(hi);
            let scale = if top > 0.0 { 1.0 / top } else { 1.0 };
            points
                .iter()
                .map(|&z| {
                    if z < lo {
                        0.0
                    } else if z > hi {
                        1.0
                    } else {
                        (curve.evaluate(z) * scale).clamp(0.0, 1.0)
                    }
                })
                .collect()
        }
    }
}

/// Fail unless the support, shrunk by half a bin, lies inside the grid
fn check_range(
    quantiles: &QuantileArray,
    grid: &[f64],
    force_range: bool,
) -> Result<(), ReconstructError> {
    let dz = grid[1] - grid[0];
    let decoded_min = quantiles.min() + dz / 2.0 + RANGE_SLACK;
    let decoded_max = quantiles.max() - dz / 2.0 - RANGE_SLACK;
    let grid_min = grid[0];
    let grid_max = grid[grid.len() - 1];

    if decoded_min < grid_min || decoded_max > grid_max {
        if !force_range {
            return Err(ReconstructError::RangeExceeded {
                decoded_min,
                decoded_max,
                grid_min,
                grid_max,
            });
        }
        warn!(
            decoded_min,
            decoded_max, grid_min, grid_max, "density truncated to the grid range"
        );
    }
    Ok(())
}

/// Reconstruct a binned density from `quantiles`.
///
/// The CDF is interpolated at the bin edges `grid ± dz/2`, differenced, and
/// normalized so the density integrates to 1 over the grid.
///
/// # Errors
///
/// [`ReconstructError::RangeExceeded`] when the support does not fit the grid
/// and `force_range` is off, [`ReconstructError::ForceRangeWithoutBounds`] when
/// `force_range` is set on a grid whose bounds come from the data, and
/// [`ReconstructError::InvalidGrid`] for an unusable grid.
///
/// # Example
///
/// ```
/// use pdfpack::quantiles::QuantileArray;
/// use pdfpack::reconstruct::{to_grid, GridSpec, ReconstructOptions};
///
/// let quantiles = QuantileArray::new(vec![0.1, 0.15, 0.2, 0.25, 0.3]).unwrap();
/// let grid: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
///
/// let pdf = to_grid(&quantiles, &GridSpec::Explicit(grid), ReconstructOptions::default()).unwrap();
/// assert!((pdf.total_mass() - 1.0).abs() < 1e-9);
/// assert_eq!(pdf.density[50], 0.0);
/// ```
pub fn to_grid(
    quantiles: &QuantileArray,
    spec: &GridSpec,
    options: ReconstructOptions,
) -> Result<BinnedPdf, ReconstructError> {
    if options.force_range && !spec.has_explicit_bounds() {
        return Err(ReconstructError::ForceRangeWithoutBounds);
    }
    let grid = spec.resolve(quantiles)?;
    check_range(quantiles, &grid, options.force_range)?;

    let dz = grid[1] - grid[0];
    let mut edges = Vec::with_capacity(grid.len() + 1);
    edges.push(grid[0] - dz / 2.0);
    edges.extend(grid.iter().map(|&z| z + dz / 2.0));

    let cdf = to_cdf(quantiles, &edges, options.method);
    let mut density: Vec<f64> = cdf.windows(2).map(|w| w[1] - w[0]).collect();

    let mass = density.iter().sum::<f64>() * dz;
    if mass > 0.0 {
        for p in density.iter_mut() {
            *p /= mass;
        }
    }

    Ok(BinnedPdf { grid, density })
}

/// A piecewise-constant density between consecutive quantiles
#[derive(Clone, Debug, PartialEq)]
pub struct StepPdf {
    /// Step boundaries: the quantiles framed by one empty step on each side
    pub edges: Vec<f64>,
    /// Density on `[edges[i], edges[i + 1])`
    pub density: Vec<f64>,
}

/// Stepwise density: each pair of consecutive quantiles holds `1 / (M - 1)`
/// of the probability, spread evenly between them
///
/// # Example
///
/// ```
/// use pdfpack::quantiles::QuantileArray;
/// use pdfpack::reconstruct::step_pdf;
///
/// let steps = step_pdf(&QuantileArray::new(vec![0.0, 0.5, 1.5]).unwrap());
/// assert_eq!(steps.edges.len(), 5);
/// assert_eq!(steps.density.len(), 4);
/// assert!((steps.density[1] - 1.0).abs() < 1e-6);
/// assert!((steps.density[2] - 0.5).abs() < 1e-6);
/// ```
pub fn step_pdf(quantiles: &QuantileArray) -> StepPdf {
    let values = quantiles.values();
    let share = quantiles.knot_spacing();

    let mut edges = Vec::with_capacity(values.len() + 2);
    edges.push(quantiles.min() - STEP_PADDING);
    edges.extend_from_slice(values);
    edges.push(quantiles.max() + STEP_PADDING);

    let mut density = vec![0.0];
    density.extend(
        values
            .windows(2)
            .map(|w| share / (w[1] - w[0] + STEP_WIDTH_FLOOR)),
    );
    density.push(0.0);

    StepPdf { edges, density }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_quantiles() -> QuantileArray {
        QuantileArray::new(crate::math::linspace(0.1, 0.3, 41)).unwrap()
    }

    fn grid(n: usize, dz: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dz).collect()
    }

    #[test]
    fn test_uniform_reconstruction_is_flat() {
        let pdf = to_grid(
            &uniform_quantiles(),
            &GridSpec::Explicit(grid(151, 0.01)),
            ReconstructOptions::default(),
        )
        .unwrap();
        assert_eq!(pdf.density.len(), 151);
        assert!((pdf.total_mass() - 1.0).abs() < 1e-9);
        for i in 11..=29 {
            assert!((pdf.density[i] - 5.0).abs() < 1e-6, "bin {}: {}", i, pdf.density[i]);
        }
        for i in (0..=9).chain(31..151) {
            assert_eq!(pdf.density[i], 0.0, "bin {}", i);
        }
    }

    #[test]
    fn test_spline_reconstruction_is_flat_and_normalized() {
        let pdf = to_grid(
            &uniform_quantiles(),
            &GridSpec::Explicit(grid(151, 0.01)),
            ReconstructOptions::default().with_method(Interpolation::Spline),
        )
        .unwrap();
        assert!((pdf.total_mass() - 1.0).abs() < 1e-9);
        assert!(pdf.density.iter().all(|&p| p >= -1e-12));
        for i in 12..=28 {
            assert!((pdf.density[i] - 5.0).abs() < 1e-3, "bin {}: {}", i, pdf.density[i]);
        }
        assert_eq!(pdf.density[100], 0.0);
    }

    #[test]
    fn test_range_exceeded() {
        let q = QuantileArray::new(vec![0.5, 1.0, 2.5]).unwrap();
        let spec = GridSpec::Explicit(grid(151, 0.01));
        let err = to_grid(&q, &spec, ReconstructOptions::default()).unwrap_err();
        match err {
            ReconstructError::RangeExceeded {
                decoded_max,
                grid_max,
                ..
            } => {
                assert!((decoded_max - 2.495).abs() < 1e-6);
                assert!((grid_max - 1.5).abs() < 1e-12);
            }
            other => panic!("unexpected error {:?}", other),
        }

        // Forced: the tail above the grid is dropped and the rest renormalized
        let pdf = to_grid(&q, &spec, ReconstructOptions::default().with_force_range(true)).unwrap();
        assert!((pdf.total_mass() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_support_ending_on_bin_edge_fits() {
        // Support [0.095, 0.305] on a 0.01 grid from 0.1 to 0.3
        let q = QuantileArray::new(vec![0.095, 0.2, 0.305]).unwrap();
        let spec = GridSpec::Step {
            step: 0.01,
            min: Some(0.1),
            max: Some(0.3),
        };
        assert!(to_grid(&q, &spec, ReconstructOptions::default()).is_ok());
    }

    #[test]
    fn test_force_range_needs_bounds() {
        let q = uniform_quantiles();
        assert_eq!(
            to_grid(
                &q,
                &GridSpec::step(0.01),
                ReconstructOptions::default().with_force_range(true)
            ),
            Err(ReconstructError::ForceRangeWithoutBounds)
        );
    }

    #[test]
    fn test_step_grid_around_delta() {
        use crate::codec::{decode, AdaptiveEncoder};
        use crate::quantiles::Samples;

        for value in [0.25, 0.3, 0.5, 1.0] {
            let draws = vec![value; 100];
            let outcome = AdaptiveEncoder::default().encode(&Samples::new(&draws)).unwrap();
            let q = decode(outcome.packet.as_bytes()).unwrap();

            let pdf = to_grid(&q, &GridSpec::step(0.01), ReconstructOptions::default()).unwrap();
            assert!((pdf.total_mass() - 1.0).abs() < 1e-9, "value {}", value);
        }
    }

    #[test]
    fn test_step_grid_widens_equal_bounds() {
        let q = QuantileArray::new(vec![0.5, 0.5, 0.5]).unwrap();
        let g = GridSpec::step(0.1).resolve(&q).unwrap();
        assert_eq!(g.len(), 3);
        assert!((g[0] - 0.4).abs() < 1e-12);
        assert!((g[2] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_spline_cdf_is_bounded_and_ends_at_one() {
        let q = QuantileArray::new(vec![0.1, 0.12, 0.2, 0.21, 0.22, 0.4, 0.9]).unwrap();
        let points: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
        let cdf = to_cdf(&q, &points, Interpolation::Spline);
        assert!(cdf.iter().all(|&c| (0.0..=1.0).contains(&c)));
        assert!(cdf.windows(2).all(|w| w[1] >= w[0] - 1e-12));
        assert_eq!(to_cdf(&q, &[q.max()], Interpolation::Spline), vec![1.0]);
        assert_eq!(to_cdf(&q, &[q.min()], Interpolation::Spline), vec![0.0]);
    }

    #[test]
    fn test_step_grid_snaps_to_step() {
        let q = QuantileArray::new(vec![0.123, 0.2, 0.287]).unwrap();
        let g = GridSpec::step(0.05).resolve(&q).unwrap();
        assert_eq!(g.len(), 5);
        assert!((g[0] - 0.1).abs() < 1e-12);
        assert!((g[4] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_bins_grid() {
        let q = uniform_quantiles();
        let g = GridSpec::bins(21).resolve(&q).unwrap();
        assert_eq!(g.len(), 21);
        assert_eq!(g[0], 0.1);
        assert_eq!(g[20], 0.3);

        let delta = QuantileArray::new(vec![0.4, 0.4]).unwrap();
        let g = GridSpec::bins(3).resolve(&delta).unwrap();
        assert!((g[0] - 0.39).abs() < 1e-12);
        assert!((g[2] - 0.41).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_grids() {
        let q = uniform_quantiles();
        assert!(matches!(
            GridSpec::Explicit(vec![0.1]).resolve(&q),
            Err(ReconstructError::InvalidGrid { .. })
        ));
        assert!(matches!(
            GridSpec::bins(1).resolve(&q),
            Err(ReconstructError::InvalidGrid { .. })
        ));
        assert!(matches!(
            GridSpec::step(-0.1).resolve(&q),
            Err(ReconstructError::InvalidGrid { .. })
        ));
        assert!(matches!(
            GridSpec::Bins {
                count: 10,
                min: Some(1.0),
                max: Some(0.5)
            }
            .resolve(&q),
            Err(ReconstructError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn test_cdf_bounds() {
        let q = uniform_quantiles();
        for method in [Interpolation::Linear, Interpolation::Spline] {
            let cdf = to_cdf(&q, &[0.0, 0.1, 0.2, 0.3, 1.0], method);
            assert_eq!(cdf[0], 0.0);
            assert!((cdf[2] - 0.5).abs() < 1e-9);
            assert!((cdf[3] - 1.0).abs() < 1e-12);
            assert_eq!(cdf[4], 1.0);
        }
    }

    #[test]
    fn test_step_pdf_delta() {
        let q = QuantileArray::new(vec![0.4, 0.4, 0.4]).unwrap();
        let steps = step_pdf(&q);
        assert!(steps.density.iter().all(|p| p.is_finite()));
        assert_eq!(steps.density[0], 0.0);
        assert_eq!(*steps.density.last().unwrap(), 0.0);
    }
}
