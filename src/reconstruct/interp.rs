//! Interpolants through a quantile table
//!
//! [`Linear`] is the numpy-style piecewise-linear lookup. [`MonotoneSpline`]
//! is a natural cubic spline that hands each interval over to a PCHIP curve
//! wherever the spline would stop being monotone there.

use crate::error::ParseError;
use crate::math;
use crate::traits::Interpolant;
use core::fmt;
use core::str::FromStr;

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Index `i` of the interval `[x[i], x[i + 1]]` holding `v`, clamped to the table
#[inline]
fn interval(x: &[f64], v: f64) -> usize {
    x.partition_point(|&k| k < v).saturating_sub(1).min(x.len() - 2)
}

fn assert_strictly_increasing(x: &[f64], y: &[f64]) {
    assert!(x.len() >= 2, "at least two knots are required");
    assert_eq!(x.len(), y.len(), "knot abscissas and values differ in length");
    assert!(
        x.windows(2).all(|w| w[0] < w[1]),
        "knot abscissas must be strictly increasing"
    );
}

#[inline]
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Piecewise-linear interpolant
///
/// Abscissas may repeat; inside a repeated run the rightmost value wins.
#[derive(Clone, Debug, PartialEq)]
pub struct Linear {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Linear {
    /// # Panics
    ///
    /// If the tables are empty, differ in length, or `x` decreases.
    pub fn new(x: &[f64], y: &[f64]) -> Self {
        assert!(!x.is_empty(), "at least one knot is required");
        assert_eq!(x.len(), y.len(), "knot abscissas and values differ in length");
        assert!(
            x.windows(2).all(|w| w[0] <= w[1]),
            "knot abscissas must be non-decreasing"
        );
        Self {
            x: x.to_vec(),
            y: y.to_vec(),
        }
    }
}

impl Interpolant for Linear {
    fn evaluate(&self, x: f64) -> f64 {
        math::interp(x, &self.x, &self.y)
    }

    fn evaluate_derivative(&self, x: f64) -> f64 {
        let n = self.x.len();
        if n < 2 || x < self.x[0] || x > self.x[n - 1] {
            return 0.0;
        }
        let j = self
            .x
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .min(n - 2);
        let h = self.x[j + 1] - self.x[j];
        if h > 0.0 {
            (self.y[j + 1] - self.y[j]) / h
        } else {
            0.0
        }
    }
}

/// Cubic spline with zero second derivative at both ends
#[derive(Clone, Debug, PartialEq)]
pub struct NaturalCubic {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot
    m: Vec<f64>,
}

impl NaturalCubic {
    /// # Panics
    ///
    /// If there are fewer than two knots or `x` is not strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Self {
        assert_strictly_increasing(x, y);
        let n = x.len();
        let mut m = vec![0.0; n];

        if n > 2 {
            let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
            let slope: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

            // Tridiagonal system for m[1..n-1], solved with the Thomas algorithm
            let k = n - 2;
            let mut c = vec![0.0; k];
            let mut d = vec![0.0; k];
            for row in 0..k {
                let i = row + 1;
                let sub = h[i - 1];
                let diag = 2.0 * (h[i - 1] + h[i]);
                let rhs = 6.0 * (slope[i] - slope[i - 1]);
                if row == 0 {
                    c[row] = h[i] / diag;
                    d[row] = rhs / diag;
                } else {
                    let w = diag - sub * c[row - 1];
                    c[row] = h[i] / w;
                    d[row] = (rhs - sub * d[row - 1]) / w;
                }
            }
            m[k] = d[k - 1];
            for row in (0..k - 1).rev() {
                m[row + 1] = d[row] - c[row] * m[row + 2];
            }
        }

        Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        }
    }

    /// Value and first derivative on interval `i`
    fn segment(&self, i: usize, v: f64) -> (f64, f64) {
        let h = self.x[i + 1] - self.x[i];
        let a = self.x[i + 1] - v;
        let b = v - self.x[i];
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let c0 = self.y[i] / h - m0 * h / 6.0;
        let c1 = self.y[i + 1] / h - m1 * h / 6.0;

        let value = m0 * a * a * a / (6.0 * h) + m1 * b * b * b / (6.0 * h) + c0 * a + c1 * b;
        let slope = -m0 * a * a / (2.0 * h) + m1 * b * b / (2.0 * h) - c0 + c1;
        (value, slope)
    }

    /// Smallest first derivative anywhere on interval `i`
    fn min_derivative_on(&self, i: usize) -> f64 {
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let mut lowest = self.segment(i, x0).1.min(self.segment(i, x1).1);

        // The derivative is quadratic; its extremum is where the linear
        // second derivative crosses zero
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        if m0 != m1 {
            let b = m0 * (x1 - x0) / (m0 - m1);
            if b > 0.0 && b < x1 - x0 {
                lowest = lowest.min(self.segment(i, x0 + b).1);
            }
        }
        lowest
    }

    fn knot_derivative(&self, i: usize) -> f64 {
        let seg = i.min(self.x.len() - 2);
        self.segment(seg, self.x[i]).1
    }
}

impl Interpolant for NaturalCubic {
    fn evaluate(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }
        self.segment(interval(&self.x, x), x).0
    }

    fn evaluate_derivative(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x < self.x[0] || x > self.x[n - 1] {
            return 0.0;
        }
        self.segment(interval(&self.x, x), x).1
    }
}

/// Piecewise cubic Hermite interpolant with Fritsch-Carlson slopes
///
/// Monotone wherever the data are monotone; flat data stay flat.
#[derive(Clone, Debug, PartialEq)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    /// First derivative at each knot
    d: Vec<f64>,
}

/// One-sided three-point end slope, limited to keep the end interval monotone
fn pchip_end_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && math::abs(d) > 3.0 * math::abs(m0) {
        3.0 * m0
    } else {
        d
    }
}

impl Pchip {
    /// # Panics
    ///
    /// If there are fewer than two knots or `x` is not strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Self {
        assert_strictly_increasing(x, y);
        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let delta: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

        let mut d = vec![0.0; n];
        if n == 2 {
            d[0] = delta[0];
            d[1] = delta[0];
        } else {
            for k in 1..n - 1 {
                if delta[k - 1] * delta[k] > 0.0 {
                    // Weighted harmonic mean of the neighbouring secants
                    let w1 = 2.0 * h[k] + h[k - 1];
                    let w2 = h[k] + 2.0 * h[k - 1];
                    d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
                }
            }
            d[0] = pchip_end_slope(h[0], h[1], delta[0], delta[1]);
            d[n - 1] = pchip_end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
        }

        Self {
            x: x.to_vec(),
            y: y.to_vec(),
            d,
        }
    }

    fn segment(&self, i: usize, v: f64) -> (f64, f64) {
        let h = self.x[i + 1] - self.x[i];
        let t = (v - self.x[i]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (d0, d1) = (self.d[i] * h, self.d[i + 1] * h);

        let value = (2.0 * t3 - 3.0 * t2 + 1.0) * y0
            + (t3 - 2.0 * t2 + t) * d0
            + (-2.0 * t3 + 3.0 * t2) * y1
            + (t3 - t2) * d1;
        let slope = ((6.0 * t2 - 6.0 * t) * y0
            + (3.0 * t2 - 4.0 * t + 1.0) * d0
            + (-6.0 * t2 + 6.0 * t) * y1
            + (3.0 * t2 - 2.0 * t) * d1)
            / h;
        (value, slope)
    }
}

impl Interpolant for Pchip {
    fn evaluate(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }
        self.segment(interval(&self.x, x), x).0
    }

    fn evaluate_derivative(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x < self.x[0] || x > self.x[n - 1] {
            return 0.0;
        }
        self.segment(interval(&self.x, x), x).1
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Shape {
    /// Every knot shares one abscissa
    Constant(f64),
    Curve {
        spline: NaturalCubic,
        pchip: Pchip,
        /// Intervals handed over to the PCHIP curve
        use_pchip: Vec<bool>,
    },
}

/// Natural cubic spline corrected to be monotone
///
/// An interval keeps the spline only when the spline's derivative is positive
/// at both of its knots and never negative inside it; every other interval is
/// drawn with PCHIP. Both curves pass through the knots, so the pieces join
/// continuously.
///
/// Knots sharing an abscissa are merged, keeping the largest value, which is
/// what a CDF with a jump needs.
///
/// # Example
///
/// ```
/// use pdfpack::reconstruct::MonotoneSpline;
/// use pdfpack::traits::Interpolant;
///
/// // A CDF with a sharp rise that a plain natural spline would overshoot
/// let z = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
/// let f = [0.0, 0.0, 0.05, 0.95, 1.0, 1.0];
/// let cdf = MonotoneSpline::new(&z, &f);
///
/// let values = cdf.evaluate_many(&[0.5, 1.5, 2.5, 3.5, 4.5]);
/// assert!(values.windows(2).all(|w| w[0] <= w[1]));
/// assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MonotoneSpline {
    shape: Shape,
}

impl MonotoneSpline {
    /// # Panics
    ///
    /// If the tables are empty, differ in length, or `x` decreases.
    pub fn new(x: &[f64], y: &[f64]) -> Self {
        assert!(!x.is_empty(), "at least one knot is required");
        assert_eq!(x.len(), y.len(), "knot abscissas and values differ in length");
        assert!(
            x.windows(2).all(|w| w[0] <= w[1]),
            "knot abscissas must be non-decreasing"
        );

        let mut xs: Vec<f64> = Vec::with_capacity(x.len());
        let mut ys: Vec<f64> = Vec::with_capacity(y.len());
        for (&xi, &yi) in x.iter().zip(y) {
            match xs.last() {
                Some(&last) if last == xi => {
                    let top = ys.len() - 1;
                    ys[top] = ys[top].max(yi);
                }
                _ => {
                    xs.push(xi);
                    ys.push(yi);
                }
            }
        }

        if xs.len() == 1 {
            return Self {
                shape: Shape::Constant(ys[0]),
            };
        }

        let spline = NaturalCubic::new(&xs, &ys);
        let pchip = Pchip::new(&xs, &ys);
        let use_pchip = (0..xs.len() - 1)
            .map(|i| {
                spline.knot_derivative(i) <= 0.0
                    || spline.knot_derivative(i + 1) <= 0.0
                    || spline.min_derivative_on(i) < 0.0
            })
            .collect();

        Self {
            shape: Shape::Curve {
                spline,
                pchip,
                use_pchip,
            },
        }
    }

    /// Number of intervals drawn with PCHIP instead of the spline
    pub fn corrected_intervals(&self) -> usize {
        match &self.shape {
            Shape::Constant(_) => 0,
            Shape::Curve { use_pchip, .. } => use_pchip.iter().filter(|&&p| p).count(),
        }
    }
}

impl Interpolant for MonotoneSpline {
    fn evaluate(&self, x: f64) -> f64 {
        match &self.shape {
            Shape::Constant(c) => *c,
            Shape::Curve {
                spline,
                pchip,
                use_pchip,
            } => {
                if use_pchip[interval(&spline.x, x)] {
                    pchip.evaluate(x)
                } else {
                    spline.evaluate(x)
                }
            }
        }
    }

    fn evaluate_derivative(&self, x: f64) -> f64 {
        match &self.shape {
            Shape::Constant(_) => 0.0,
            Shape::Curve {
                spline,
                pchip,
                use_pchip,
            } => {
                if use_pchip[interval(&spline.x, x)] {
                    pchip.evaluate_derivative(x)
                } else {
                    spline.evaluate_derivative(x)
                }
            }
        }
    }
}

/// How to draw a continuous curve through quantiles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Interpolation {
    #[default]
    Linear,
    /// [`MonotoneSpline`]
    Spline,
}

impl Interpolation {
    /// Build the interpolant through `(x, y)`
    pub fn build(self, x: &[f64], y: &[f64]) -> Interpolator {
        match self {
            Interpolation::Linear => Interpolator::Linear(Linear::new(x, y)),
            Interpolation::Spline => Interpolator::Spline(MonotoneSpline::new(x, y)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpolation::Linear => "linear",
            Interpolation::Spline => "spline",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interpolation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("linear") {
            Ok(Interpolation::Linear)
        } else if s.eq_ignore_ascii_case("spline") {
            Ok(Interpolation::Spline)
        } else {
            Err(ParseError::UnknownInterpolation(s.into()))
        }
    }
}

/// An interpolant chosen by [`Interpolation`]
#[derive(Clone, Debug, PartialEq)]
pub enum Interpolator {
    Linear(Linear),
    Spline(MonotoneSpline),
}

impl Interpolant for Interpolator {
    fn evaluate(&self, x: f64) -> f64 {
        match self {
            Interpolator::Linear(curve) => curve.evaluate(x),
            Interpolator::Spline(curve) => curve.evaluate(x),
        }
    }

    fn evaluate_derivative(&self, x: f64) -> f64 {
        match self {
            Interpolator::Linear(curve) => curve.evaluate_derivative(x),
            Interpolator::Spline(curve) => curve.evaluate_derivative(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_linear_matches_table_lookup() {
        let curve = Linear::new(&[0.0, 1.0, 3.0], &[0.0, 2.0, 3.0]);
        assert!(close(curve.evaluate(0.5), 1.0));
        assert!(close(curve.evaluate(2.0), 2.5));
        assert!(close(curve.evaluate(-1.0), 0.0));
        assert!(close(curve.evaluate(4.0), 3.0));
        assert!(close(curve.evaluate_derivative(0.5), 2.0));
        assert!(close(curve.evaluate_derivative(2.0), 0.5));
        assert_eq!(curve.evaluate_derivative(5.0), 0.0);
    }

    #[test]
    fn test_natural_cubic_known_values() {
        // S(x) = 1.5x - 0.5x^3 on [0, 1]
        let curve = NaturalCubic::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]);
        assert!(close(curve.evaluate(0.5), 0.6875));
        assert!(close(curve.evaluate_derivative(0.0), 1.5));
        assert!(close(curve.evaluate(1.0), 1.0));
        assert!(close(curve.evaluate(1.5), 0.6875));
    }

    #[test]
    fn test_natural_cubic_reproduces_lines() {
        let x = [0.0, 0.5, 2.0, 2.5, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let curve = NaturalCubic::new(&x, &y);
        for v in [0.1, 0.7, 1.9, 3.3] {
            assert!((curve.evaluate(v) - (3.0 * v - 1.0)).abs() < 1e-9);
            assert!((curve.evaluate_derivative(v) - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pchip_known_values() {
        let curve = Pchip::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]);
        assert!(close(curve.evaluate(0.5), 0.3125));
        assert!(close(curve.evaluate_derivative(1.0), 1.5));
        assert!(close(curve.evaluate_derivative(0.0), 0.0));
        assert!(close(curve.evaluate_derivative(2.0), 4.0));
    }

    #[test]
    fn test_pchip_keeps_flat_runs_flat() {
        let curve = Pchip::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(curve.evaluate(0.5), 0.0);
        assert_eq!(curve.evaluate(2.5), 1.0);
        assert!(close(curve.evaluate(1.5), 0.5));
    }

    #[test]
    fn test_monotone_spline_never_decreases() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let plain = NaturalCubic::new(&x, &y);
        let curve = MonotoneSpline::new(&x, &y);
        assert!(curve.corrected_intervals() > 0);

        let xs: Vec<f64> = (0..=500).map(|i| i as f64 * 0.01).collect();
        // The plain spline overshoots
        assert!(xs.iter().any(|&v| plain.evaluate(v) > 1.0 || plain.evaluate(v) < 0.0));

        let values = curve.evaluate_many(&xs);
        assert!(values.windows(2).all(|w| w[0] <= w[1] + 1e-12));
        assert!(values.iter().all(|&v| (-1e-12..=1.0 + 1e-12).contains(&v)));
    }

    #[test]
    fn test_monotone_spline_keeps_smooth_intervals() {
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v + v).collect();
        let curve = MonotoneSpline::new(&x, &y);
        let spline = NaturalCubic::new(&x, &y);
        assert_eq!(curve.corrected_intervals(), 0);
        assert_eq!(curve.evaluate(2.3), spline.evaluate(2.3));
    }

    #[test]
    fn test_monotone_spline_merges_repeated_knots() {
        let curve = MonotoneSpline::new(&[0.0, 1.0, 1.0, 2.0], &[0.0, 0.3, 0.6, 1.0]);
        assert!(close(curve.evaluate(1.0), 0.6));

        let delta = MonotoneSpline::new(&[0.5, 0.5, 0.5], &[0.0, 0.5, 1.0]);
        assert_eq!(delta.evaluate(0.2), 1.0);
        assert_eq!(delta.evaluate_derivative(0.5), 0.0);
    }

    #[test]
    fn test_interpolation_parsing() {
        assert_eq!("linear".parse::<Interpolation>(), Ok(Interpolation::Linear));
        assert_eq!("SPLINE".parse::<Interpolation>(), Ok(Interpolation::Spline));
        assert!("cubic".parse::<Interpolation>().is_err());
        assert_eq!(Interpolation::Spline.to_string(), "spline");
        assert_eq!(Interpolation::default(), Interpolation::Linear);
    }

    #[test]
    fn test_interpolator_dispatch() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 4.0];
        let linear = Interpolation::Linear.build(&x, &y);
        assert!(close(linear.evaluate(1.5), 2.5));
        let spline = Interpolation::Spline.build(&x, &y);
        assert!(close(spline.evaluate(1.0), 1.0));
        assert!(spline.evaluate(1.5) < 2.5);
    }
}
