//! Math function wrappers for std/no_std compatibility
//!
//! Uses standard library math when available, falls back to libm for no_std.
//! Also hosts the piecewise-linear table lookup every family shares.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

#[cfg(feature = "std")]
#[inline]
pub fn sqrt(x: f64) -> f64 {
    x.sqrt()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn sqrt(x: f64) -> f64 {
    libm::sqrt(x)
}

#[cfg(feature = "std")]
#[inline]
pub fn ceil(x: f64) -> f64 {
    x.ceil()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn ceil(x: f64) -> f64 {
    libm::ceil(x)
}

#[cfg(feature = "std")]
#[inline]
pub fn floor(x: f64) -> f64 {
    x.floor()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn floor(x: f64) -> f64 {
    libm::floor(x)
}

/// Round half away from zero
#[cfg(feature = "std")]
#[inline]
pub fn round(x: f64) -> f64 {
    x.round()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn round(x: f64) -> f64 {
    libm::round(x)
}

#[cfg(feature = "std")]
#[inline]
pub fn abs(x: f64) -> f64 {
    x.abs()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn abs(x: f64) -> f64 {
    libm::fabs(x)
}

/// `n` evenly spaced values from `start` to `stop`, both ends included
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the last value so it is exactly `stop`
            out[n - 1] = stop;
            out
        }
    }
}

/// Piecewise-linear lookup of `x` in the table `(xp, fp)`.
///
/// `xp` must be non-decreasing and the same length as `fp`. Values left of
/// the table return `left`, values right of it return `right`. Inside a run
/// of repeated abscissas the rightmost entry wins, so a table describing a
/// CDF with a jump reads the post-jump value.
pub fn interp_with(x: f64, xp: &[f64], fp: &[f64], left: f64, right: f64) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len();
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x < xp[0] {
        return left;
    }
    if x > xp[n - 1] {
        return right;
    }
    if x == xp[n - 1] {
        return fp[n - 1];
    }

    // xp[j] <= x < xp[j + 1]
    let j = xp.partition_point(|&v| v <= x) - 1;
    let x0 = xp[j];
    let x1 = xp[j + 1];
    let t = (x - x0) / (x1 - x0);
    fp[j] + t * (fp[j + 1] - fp[j])
}

/// [`interp_with`] clamped to the table's end values
#[inline]
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    match (fp.first(), fp.last()) {
        (Some(&first), Some(&last)) => interp_with(x, xp, fp, first, last),
        _ => f64::NAN,
    }
}

/// Number of points in `start, start + step, ...` strictly below `stop`
pub fn arange_len(start: f64, stop: f64, step: f64) -> usize {
    if !(step > 0.0) || !(stop > start) {
        return 0;
    }
    ceil((stop - start) / step) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(0.0, 1.0, 5);
        assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_interp_clamps() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [10.0, 20.0, 40.0];
        assert_eq!(interp(-1.0, &xp, &fp), 10.0);
        assert_eq!(interp(3.0, &xp, &fp), 40.0);
        assert_eq!(interp(0.5, &xp, &fp), 15.0);
        assert_eq!(interp(1.5, &xp, &fp), 30.0);
        assert_eq!(interp_with(-1.0, &xp, &fp, 0.0, 1.0), 0.0);
        assert_eq!(interp_with(9.0, &xp, &fp, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_interp_repeated_abscissa() {
        // A jump at x = 1: the rightmost entry of the run wins
        let xp = [0.0, 1.0, 1.0, 2.0];
        let fp = [0.0, 0.2, 0.8, 1.0];
        assert_eq!(interp(1.0, &xp, &fp), 0.8);
        assert!((interp(1.5, &xp, &fp) - 0.9).abs() < 1e-12);
        assert!((interp(0.5, &xp, &fp) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_arange_len() {
        assert_eq!(arange_len(0.0, 1.0, 0.25), 4);
        assert_eq!(arange_len(0.0, 1.1, 0.25), 5);
        assert_eq!(arange_len(1.0, 1.0, 0.25), 0);
        assert_eq!(arange_len(0.0, 1.0, 0.0), 0);
    }

    #[test]
    fn test_round_half_away() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -3.0);
        assert_eq!(abs(-1.5), 1.5);
    }
}
