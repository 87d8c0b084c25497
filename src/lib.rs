//! # pdfpack
//!
//! Fixed-size packet compression for redshift probability distributions.
//!
//! A redshift PDF, given as a binned density or as random draws, is reduced
//! to a handful of quantiles and packed into a byte buffer of fixed length.
//! Packets can be stored as a fixed-width column, decoded back to quantiles,
//! rebuilt into densities on any grid, or summarized without rebuilding.
//!
//! ## Features
//!
//! - **Quantile extraction**: from histograms and from samples
//! - **Packet codec**: variable-resolution deltas with escape records
//! - **Adaptive encoding**: picks the quantile count that fills the packet
//! - **Reconstruction**: binned densities, CDFs and random draws, linear or
//!   monotone spline
//! - **Point estimates**: mode, mean, median, odds, HPD credible intervals
//!
//! ## Quick Start
//!
//! ```rust
//! use pdfpack::prelude::*;
//!
//! let grid: Vec<f64> = (0..=150).map(|i| i as f64 * 0.01).collect();
//! // Flat between 0.1 and 0.3
//! let density: Vec<f64> = (0..=150)
//!     .map(|i| if (10..=30).contains(&i) { 1.0 } else { 0.0 })
//!     .collect();
//!
//! let histogram = Histogram::new(&grid, &density).unwrap();
//! let outcome = AdaptiveEncoder::default().encode(&histogram).unwrap();
//! assert_eq!(outcome.packet.len(), 80);
//!
//! let quantiles = decode(outcome.packet.as_bytes()).unwrap();
//! assert!((median(&quantiles) - 0.2).abs() < 1e-3);
//! ```
//!
//! ## Feature Flags
//!
//! - `reconstruct` (default): densities, CDFs and samples from quantiles
//! - `estimators` (default): point estimates and the named quantity catalogue
//! - `batch` (default): entry points over many rows
//! - `parallel`: process batch rows with rayon
//! - `full`: everything above plus `serde`
//!
//! Platform features:
//! - `std` (default): Standard library support
//! - `serde`: Enable serialization

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod error;
pub mod math;
pub mod traits;

pub mod codec;
pub mod quantiles;

#[cfg(feature = "reconstruct")]
#[cfg_attr(docsrs, doc(cfg(feature = "reconstruct")))]
pub mod reconstruct;

#[cfg(feature = "estimators")]
#[cfg_attr(docsrs, doc(cfg(feature = "estimators")))]
pub mod estimators;

#[cfg(feature = "batch")]
#[cfg_attr(docsrs, doc(cfg(feature = "batch")))]
pub mod batch;

pub mod prelude {
    pub use crate::codec::{decode, encode, AdaptiveEncoder, EncoderConfig, Packet};
    pub use crate::error::*;
    pub use crate::quantiles::{Histogram, QuantileArray, Samples};
    pub use crate::traits::*;

    #[cfg(feature = "reconstruct")]
    pub use crate::reconstruct::{to_grid, to_samples, GridSpec, Interpolation, ReconstructOptions};

    #[cfg(feature = "estimators")]
    pub use crate::estimators::{
        hpdci, mean, measure, median, mode, EstimatorConfig, PointEstimates, Quantity,
    };
}

pub use codec::{AdaptiveEncoder, Packet};
pub use error::{DecodeError, EncodeError, QuantileError};
pub use quantiles::QuantileArray;
