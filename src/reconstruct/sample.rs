//! Random draws from a quantile array

use super::interp::Interpolation;
use crate::error::ReconstructError;
use crate::quantiles::QuantileArray;
use crate::traits::Interpolant;
use rand::Rng;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Draw `count` samples by inverting the CDF at uniform random probabilities
///
/// # Example
///
/// ```
/// use pdfpack::quantiles::QuantileArray;
/// use pdfpack::reconstruct::{to_samples, Interpolation};
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let quantiles = QuantileArray::new(vec![0.1, 0.2, 0.3]).unwrap();
/// let mut rng = StdRng::seed_from_u64(7);
///
/// let draws = to_samples(&quantiles, 100, Interpolation::Linear, &mut rng).unwrap();
/// assert_eq!(draws.len(), 100);
/// assert!(draws.iter().all(|z| (0.1..=0.3).contains(z)));
/// ```
pub fn to_samples<R: Rng + ?Sized>(
    quantiles: &QuantileArray,
    count: usize,
    method: Interpolation,
    rng: &mut R,
) -> Result<Vec<f64>, ReconstructError> {
    if count == 0 {
        return Err(ReconstructError::InvalidSampleCount { count });
    }
    let inverse_cdf = method.build(&quantiles.knots(), quantiles.values());
    Ok((0..count)
        .map(|_| inverse_cdf.evaluate(rng.random::<f64>()))
        .collect())
}
