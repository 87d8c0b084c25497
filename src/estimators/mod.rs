//! Point estimates from quantile arrays
//!
//! All estimators work on the quantile table directly, treating the CDF as
//! the piecewise-linear curve through `(quantile[i], i / (M - 1))`.
//!
//! - [`point`]: median, mean and its error, mode, odds, HPD credible intervals
//! - [`Quantity`] and [`measure`]: the named catalogue computed in one call
//!
//! # Example
//!
//! ```
//! use pdfpack::estimators::{measure, parse_quantities, EstimatorConfig, Quantity};
//! use pdfpack::quantiles::QuantileArray;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let q = QuantileArray::new(vec![0.40, 0.44, 0.45, 0.46, 0.50]).unwrap();
//! let wanted = parse_quantities(["Z_MEDIAN", "z_min_hpdci68", "z_max_hpdci68"]).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let estimates = measure(&q, &wanted, &EstimatorConfig::default(), &mut rng);
//! assert_eq!(estimates.get(Quantity::ZMedian), Some(0.45));
//! assert!(estimates.get(Quantity::ZMinHpdci68).unwrap() < 0.45);
//! ```

pub mod point;
mod summary;

pub use point::{
    hpdci, mean, mean_err, median, mode, odds, random, CredibleInterval, DEFAULT_MODE_WIDTH,
    DEFAULT_ODDS_WINDOW,
};
pub use summary::{
    measure, parse_quantities, EstimatorConfig, PointEstimates, Quantity, FLAG_NO_DATA,
};
