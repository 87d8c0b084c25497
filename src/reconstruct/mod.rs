//! Distributions rebuilt from decoded quantiles
//!
//! - [`to_grid`]: a normalized binned density on a [`GridSpec`]
//! - [`to_cdf`]: the CDF at arbitrary points
//! - [`to_samples`]: random draws through the inverse CDF
//! - [`step_pdf`]: the piecewise-constant density implied by the quantiles
//!
//! Every reconstruction reads the CDF through one [`Interpolation`]: linear,
//! or a natural cubic spline kept monotone by PCHIP corrections.
//!
//! # Example
//!
//! ```
//! use pdfpack::quantiles::QuantileArray;
//! use pdfpack::reconstruct::{to_grid, GridSpec, Interpolation, ReconstructOptions};
//!
//! let quantiles = QuantileArray::new(vec![0.30, 0.42, 0.45, 0.48, 0.60]).unwrap();
//! let options = ReconstructOptions::default().with_method(Interpolation::Spline);
//!
//! let pdf = to_grid(&quantiles, &GridSpec::step(0.01), options).unwrap();
//! let peak = pdf
//!     .density
//!     .iter()
//!     .enumerate()
//!     .max_by(|a, b| a.1.total_cmp(b.1))
//!     .map(|(i, _)| pdf.grid[i])
//!     .unwrap();
//! assert!((peak - 0.45).abs() < 0.035);
//! ```

mod grid;
mod interp;
mod sample;

pub use grid::{step_pdf, to_cdf, to_grid, BinnedPdf, GridSpec, ReconstructOptions, StepPdf};
pub use interp::{Interpolation, Interpolator, Linear, MonotoneSpline, NaturalCubic, Pchip};
pub use sample::to_samples;
