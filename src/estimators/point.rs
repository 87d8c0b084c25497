//! Scalar summaries read straight off a quantile array
//!
//! Nothing here builds a dense density: the CDF is the piecewise-linear
//! curve through `(quantile[i], i / (M - 1))`, and every estimate is an
//! interpolation or a trapezoidal sum over that table.

use crate::math;
use crate::quantiles::QuantileArray;
use rand::Rng;

/// Default half-width of the window used to locate the mode
pub const DEFAULT_MODE_WIDTH: f64 = 0.005;
/// Default odds window, scaled by `1 + z`
pub const DEFAULT_ODDS_WINDOW: f64 = 0.03;

/// Candidate interval starts are this fraction of the knot spacing apart
const HPD_SCAN_FRACTION: f64 = 0.2;

/// A credible interval in redshift
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CredibleInterval {
    pub lower: f64,
    pub upper: f64,
}

impl CredibleInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, z: f64) -> bool {
        self.lower <= z && z <= self.upper
    }
}

/// Redshift with half the probability on either side
pub fn median(quantiles: &QuantileArray) -> f64 {
    quantiles.quantile_at(0.5)
}

/// Trapezoidal integral of `f(quantile)` over cumulative probability
fn integrate(quantiles: &QuantileArray, f: impl Fn(f64) -> f64) -> f64 {
    let step = quantiles.knot_spacing();
    quantiles
        .values()
        .windows(2)
        .map(|w| 0.5 * step * (f(w[0]) + f(w[1])))
        .sum()
}

/// `E[z]`, the integral of `z dF`
pub fn mean(quantiles: &QuantileArray) -> f64 {
    integrate(quantiles, |z| z)
}

/// Standard deviation about the mean, `sqrt(E[z^2] - E[z]^2)`
///
/// Rounding can push the variance of a delta-like distribution slightly
/// below zero; it is floored at zero.
pub fn mean_err(quantiles: &QuantileArray) -> f64 {
    let mean = mean(quantiles);
    let second = integrate(quantiles, |z| z * z);
    math::sqrt((second - mean * mean).max(0.0))
}

/// One draw through the inverse CDF
pub fn random<R: Rng + ?Sized>(quantiles: &QuantileArray, rng: &mut R) -> f64 {
    quantiles.quantile_at(rng.random::<f64>())
}

/// Most probable redshift.
///
/// For every quantile the probability within `width` above it and within
/// `width` below it is measured; the window holding the most probability
/// wins and its center is returned.
///
/// # Example
///
/// ```
/// use pdfpack::estimators::mode;
/// use pdfpack::quantiles::QuantileArray;
///
/// // 40% of the probability is packed between 0.400 and 0.410
/// let q = QuantileArray::new(vec![0.0, 0.4, 0.404, 0.41, 1.0, 2.0]).unwrap();
/// assert!((mode(&q, 0.005) - 0.4025).abs() < 1e-9);
/// ```
pub fn mode(quantiles: &QuantileArray, width: f64) -> f64 {
    let values = quantiles.values();
    let knots = quantiles.knots();
    let cdf = |z: f64| math::interp_with(z, values, &knots, 0.0, 1.0);

    let mut best_plus = (0, f64::NEG_INFINITY);
    let mut best_minus = (0, f64::NEG_INFINITY);
    for (i, (&z, &k)) in values.iter().zip(&knots).enumerate() {
        let plus = cdf(z + width) - k;
        let minus = k - cdf(z - width);
        if plus > best_plus.1 {
            best_plus = (i, plus);
        }
        if minus > best_minus.1 {
            best_minus = (i, minus);
        }
    }

    if best_plus.1 > best_minus.1 {
        values[best_plus.0] + width / 2.0
    } else {
        values[best_minus.0] - width / 2.0
    }
}

/// Probability within `zcenter ± window * (1 + zcenter)`
pub fn odds(quantiles: &QuantileArray, zcenter: f64, window: f64) -> f64 {
    let half = window * (1.0 + zcenter);
    quantiles.cdf_at(zcenter + half) - quantiles.cdf_at(zcenter - half)
}

/// Highest posterior density credible interval.
///
/// Scans windows of `confidence` probability whose start moves in steps of
/// a fifth of the knot spacing and returns the narrowest in redshift. With
/// `zinside` the scan is limited to windows that can contain that redshift.
/// When no window fits, both bounds are the median.
///
/// # Example
///
/// ```
/// use pdfpack::estimators::hpdci;
/// use pdfpack::quantiles::QuantileArray;
///
/// // Uniform on [0.1, 0.3]
/// let q = QuantileArray::new((0..=20).map(|i| 0.1 + 0.01 * i as f64).collect()).unwrap();
/// let ci = hpdci(&q, 0.68, None);
/// assert!((ci.width() - 0.136).abs() < 1e-9);
/// ```
pub fn hpdci(
    quantiles: &QuantileArray,
    confidence: f64,
    zinside: Option<f64>,
) -> CredibleInterval {
    let (lo, hi) = match zinside {
        Some(z) => {
            let p = quantiles.cdf_at(z);
            ((p - confidence).max(0.0), (p + confidence).min(1.0))
        }
        None => (0.0, 1.0),
    };

    let step = HPD_SCAN_FRACTION * quantiles.knot_spacing();
    let starts = math::arange_len(lo, hi - confidence, step);
    let ends = math::arange_len(lo + confidence, hi, step);
    let candidates = starts.min(ends);
    if candidates == 0 {
        let center = median(quantiles);
        return CredibleInterval {
            lower: center,
            upper: center,
        };
    }

    let mut best = CredibleInterval {
        lower: 0.0,
        upper: f64::INFINITY,
    };
    let mut best_width = f64::INFINITY;
    for i in 0..candidates {
        let offset = step * i as f64;
        let candidate = CredibleInterval {
            lower: quantiles.quantile_at(lo + offset),
            upper: quantiles.quantile_at(lo + confidence + offset),
        };
        if candidate.width() < best_width {
            best_width = candidate.width();
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform() -> QuantileArray {
        QuantileArray::new(math::linspace(0.1, 0.3, 71)).unwrap()
    }

    #[test]
    fn test_uniform_summaries() {
        let q = uniform();
        assert!((median(&q) - 0.2).abs() < 1e-12);
        assert!((mean(&q) - 0.2).abs() < 1e-12);
        // Uniform of width 0.2: sigma = 0.2 / sqrt(12), up to trapezoid error
        assert!((mean_err(&q) - 0.2 / 12f64.sqrt()).abs() < 1e-4);
        let ci = hpdci(&q, 0.68, None);
        assert!((ci.width() - 0.136).abs() < 1e-9);
        let ci95 = hpdci(&q, 0.95, None);
        assert!((ci95.width() - 0.19).abs() < 1e-9);
    }

    #[test]
    fn test_hpdci_prefers_the_peak() {
        // Dense core between 0.49 and 0.51 holding 80% of the probability
        let q = QuantileArray::new(vec![0.0, 0.49, 0.495, 0.5, 0.505, 0.51, 1.0]).unwrap();
        let ci = hpdci(&q, 0.5, None);
        assert!(ci.lower >= 0.49 - 1e-9 && ci.upper <= 0.51 + 1e-9, "{:?}", ci);
    }

    #[test]
    fn test_hpdci_containing_a_point() {
        let q = uniform();
        let ci = hpdci(&q, 0.68, Some(0.12));
        assert!(ci.contains(0.12), "{:?}", ci);
        assert!((ci.width() - 0.136).abs() < 1e-9);
    }

    #[test]
    fn test_hpdci_degenerate_window() {
        let q = QuantileArray::new(vec![0.2, 0.3]).unwrap();
        // A full-probability window never fits strictly inside [0, 1]
        let ci = hpdci(&q, 1.0, None);
        assert_eq!(ci.lower, median(&q));
        assert_eq!(ci.upper, median(&q));
    }

    #[test]
    fn test_delta_summaries_agree() {
        let q = QuantileArray::new(math::linspace(0.415, 0.425, 11)).unwrap();
        let zmode = mode(&q, DEFAULT_MODE_WIDTH);
        for z in [zmode, mean(&q), median(&q)] {
            assert!((z - 0.42).abs() <= 0.005, "{}", z);
        }
        assert!(mean_err(&q) < 0.005);
    }

    #[test]
    fn test_mode_of_repeated_quantiles() {
        let q = QuantileArray::new(vec![0.7, 0.7, 0.7, 0.7]).unwrap();
        let zmode = mode(&q, DEFAULT_MODE_WIDTH);
        assert!((zmode - 0.7).abs() <= DEFAULT_MODE_WIDTH);
        assert!(mean_err(&q) < 1e-6);
    }

    #[test]
    fn test_odds() {
        let q = uniform();
        // Window 0.2 ± 0.03 * 1.2 = [0.164, 0.236]
        assert!((odds(&q, 0.2, DEFAULT_ODDS_WINDOW) - 0.36).abs() < 1e-9);
        assert!((odds(&q, 0.2, 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(odds(&q, 5.0, 0.01), 0.0);
    }

    #[test]
    fn test_random_within_support() {
        let q = uniform();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let z = random(&q, &mut rng);
            assert!((0.1..=0.3).contains(&z));
        }
    }
}
