//! Named point estimates
//!
//! [`Quantity`] is the catalogue of scalar summaries a decoded distribution
//! can be measured for. [`measure`] computes only what is requested, plus
//! the estimates those depend on, and returns them in a [`PointEstimates`]
//! bundle.

use super::point::{self, DEFAULT_MODE_WIDTH, DEFAULT_ODDS_WINDOW};
use crate::error::ParseError;
use crate::quantiles::QuantileArray;
use core::fmt;
use core::str::FromStr;
use rand::Rng;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Flag set on rows whose packet holds no data
pub const FLAG_NO_DATA: u32 = 1024;

/// Confidence of the narrower credible interval, also used for `Z_MODE_ERR`
const HPDCI68: f64 = 0.68;
const HPDCI95: f64 = 0.95;

/// A scalar summary of a redshift distribution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum Quantity {
    ZMode,
    ZMean,
    ZMedian,
    ZRandom,
    ZModeErr,
    ZMeanErr,
    OddsMode,
    OddsMean,
    ZMinHpdci68,
    ZMaxHpdci68,
    ZMinHpdci95,
    ZMaxHpdci95,
}

impl Quantity {
    pub const COUNT: usize = 12;

    /// Every quantity, in canonical order
    pub const ALL: [Quantity; Quantity::COUNT] = [
        Quantity::ZMode,
        Quantity::ZMean,
        Quantity::ZMedian,
        Quantity::ZRandom,
        Quantity::ZModeErr,
        Quantity::ZMeanErr,
        Quantity::OddsMode,
        Quantity::OddsMean,
        Quantity::ZMinHpdci68,
        Quantity::ZMaxHpdci68,
        Quantity::ZMinHpdci95,
        Quantity::ZMaxHpdci95,
    ];

    /// Column name, e.g. `Z_MODE`
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::ZMode => "Z_MODE",
            Quantity::ZMean => "Z_MEAN",
            Quantity::ZMedian => "Z_MEDIAN",
            Quantity::ZRandom => "Z_RANDOM",
            Quantity::ZModeErr => "Z_MODE_ERR",
            Quantity::ZMeanErr => "Z_MEAN_ERR",
            Quantity::OddsMode => "ODDS_MODE",
            Quantity::OddsMean => "ODDS_MEAN",
            Quantity::ZMinHpdci68 => "Z_MIN_HPDCI68",
            Quantity::ZMaxHpdci68 => "Z_MAX_HPDCI68",
            Quantity::ZMinHpdci95 => "Z_MIN_HPDCI95",
            Quantity::ZMaxHpdci95 => "Z_MAX_HPDCI95",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Quantity::ZMode => {
                "Mode of the redshift PDF, defined as the redshift with maximum probability density."
            }
            Quantity::ZMean => {
                "Mean of the redshift PDF, defined as the integral over z of z*P(z)."
            }
            Quantity::ZMedian => {
                "Median of the redshift PDF (the redshift with a 50/50 chance of the true \
                 redshift being on either side)."
            }
            Quantity::ZRandom => {
                "A random redshift drawn with the PDF as the underlying probability distribution."
            }
            Quantity::ZModeErr => "1-sigma uncertainty in Z_MODE.",
            Quantity::ZMeanErr => "1-sigma uncertainty in Z_MEAN.",
            Quantity::OddsMode => {
                "Probability that the true redshift lies within a window around Z_MODE \
                 (default ± 0.03 × (1 + Z_MODE))."
            }
            Quantity::OddsMean => {
                "Probability that the true redshift lies within a window around Z_MEAN \
                 (default ± 0.03 × (1 + Z_MEAN))."
            }
            Quantity::ZMinHpdci68 => {
                "Lower bound of the 68% highest posterior density credible interval."
            }
            Quantity::ZMaxHpdci68 => {
                "Upper bound of the 68% highest posterior density credible interval."
            }
            Quantity::ZMinHpdci95 => {
                "Lower bound of the 95% highest posterior density credible interval."
            }
            Quantity::ZMaxHpdci95 => {
                "Upper bound of the 95% highest posterior density credible interval."
            }
        }
    }

    /// Estimates that must be computed before this one
    pub fn dependencies(&self) -> &'static [Quantity] {
        match self {
            Quantity::ZModeErr | Quantity::OddsMode => &[Quantity::ZMode],
            Quantity::OddsMean => &[Quantity::ZMean],
            _ => &[],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quantity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Quantity::ALL
            .iter()
            .copied()
            .find(|q| q.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownQuantity(s.into()))
    }
}

/// Parse a list of quantity names, case-insensitively.
///
/// `ALL` expands to every quantity. The result holds each quantity once, in
/// canonical order.
///
/// # Example
///
/// ```
/// use pdfpack::estimators::{parse_quantities, Quantity};
///
/// let quantities = parse_quantities(["odds_mode", "Z_MEDIAN", "z_median"]).unwrap();
/// assert_eq!(quantities, vec![Quantity::ZMedian, Quantity::OddsMode]);
/// assert_eq!(parse_quantities(["all"]).unwrap().len(), Quantity::COUNT);
/// ```
pub fn parse_quantities<'a, I>(names: I) -> Result<Vec<Quantity>, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut wanted = [false; Quantity::COUNT];
    for name in names {
        if name.trim().eq_ignore_ascii_case("ALL") {
            wanted = [true; Quantity::COUNT];
            continue;
        }
        wanted[name.parse::<Quantity>()?.index()] = true;
    }
    Ok(Quantity::ALL
        .iter()
        .copied()
        .filter(|q| wanted[q.index()])
        .collect())
}

/// Window widths used by the mode and odds estimators
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorConfig {
    /// Half-width of the mode window
    pub mode_width: f64,
    /// Odds half-window, scaled by `1 + z`
    pub odds_window: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            mode_width: DEFAULT_MODE_WIDTH,
            odds_window: DEFAULT_ODDS_WINDOW,
        }
    }
}

impl EstimatorConfig {
    /// # Panics
    ///
    /// Panics if `width` is not finite and positive.
    pub fn with_mode_width(mut self, width: f64) -> Self {
        assert!(
            width.is_finite() && width > 0.0,
            "mode width must be finite and positive"
        );
        self.mode_width = width;
        self
    }

    /// # Panics
    ///
    /// Panics if `window` is not finite and positive.
    pub fn with_odds_window(mut self, window: f64) -> Self {
        assert!(
            window.is_finite() && window > 0.0,
            "odds window must be finite and positive"
        );
        self.odds_window = window;
        self
    }
}

/// A set of measured quantities
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointEstimates {
    values: [Option<f64>; Quantity::COUNT],
}

impl PointEstimates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, quantity: Quantity) -> Option<f64> {
        self.values[quantity.index()]
    }

    pub fn set(&mut self, quantity: Quantity, value: f64) {
        self.values[quantity.index()] = Some(value);
    }

    pub fn contains(&self, quantity: Quantity) -> bool {
        self.get(quantity).is_some()
    }

    /// Measured quantities in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Quantity, f64)> + '_ {
        Quantity::ALL
            .iter()
            .filter_map(move |&q| self.get(q).map(|v| (q, v)))
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the quantities in `keep`
    fn retain(&mut self, keep: &[bool; Quantity::COUNT]) {
        for (value, &keep) in self.values.iter_mut().zip(keep) {
            if !keep {
                *value = None;
            }
        }
    }
}

/// Measure the requested quantities.
///
/// Dependencies are computed as needed and dropped from the result unless
/// they were requested too. The random generator is only drawn from when
/// `Z_RANDOM` is requested.
///
/// # Example
///
/// ```
/// use pdfpack::estimators::{measure, EstimatorConfig, Quantity};
/// use pdfpack::quantiles::QuantileArray;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let q = QuantileArray::new((0..=20).map(|i| 0.1 + 0.01 * i as f64).collect()).unwrap();
/// let mut rng = StdRng::seed_from_u64(0);
///
/// let estimates = measure(&q, &[Quantity::OddsMean], &EstimatorConfig::default(), &mut rng);
/// assert_eq!(estimates.len(), 1);
/// assert!(estimates.get(Quantity::ZMean).is_none());
/// assert!((estimates.get(Quantity::OddsMean).unwrap() - 0.36).abs() < 1e-9);
/// ```
pub fn measure<R: Rng + ?Sized>(
    quantiles: &QuantileArray,
    requested: &[Quantity],
    config: &EstimatorConfig,
    rng: &mut R,
) -> PointEstimates {
    let mut keep = [false; Quantity::COUNT];
    let mut needed = [false; Quantity::COUNT];
    for &q in requested {
        keep[q.index()] = true;
        needed[q.index()] = true;
        for dep in q.dependencies() {
            needed[dep.index()] = true;
        }
    }
    let needs = |q: Quantity| needed[q.index()];

    let mut out = PointEstimates::new();
    if needs(Quantity::ZMode) {
        out.set(Quantity::ZMode, point::mode(quantiles, config.mode_width));
    }
    if needs(Quantity::ZMean) {
        out.set(Quantity::ZMean, point::mean(quantiles));
    }
    if needs(Quantity::ZMedian) {
        out.set(Quantity::ZMedian, point::median(quantiles));
    }
    if needs(Quantity::ZRandom) {
        out.set(Quantity::ZRandom, point::random(quantiles, rng));
    }
    if needs(Quantity::ZMeanErr) {
        out.set(Quantity::ZMeanErr, point::mean_err(quantiles));
    }
    if let (true, Some(zmode)) = (needs(Quantity::OddsMode), out.get(Quantity::ZMode)) {
        let odds = point::odds(quantiles, zmode, config.odds_window);
        out.set(Quantity::OddsMode, odds);
    }
    if let (true, Some(zmean)) = (needs(Quantity::OddsMean), out.get(Quantity::ZMean)) {
        let odds = point::odds(quantiles, zmean, config.odds_window);
        out.set(Quantity::OddsMean, odds);
    }
    if let (true, Some(zmode)) = (needs(Quantity::ZModeErr), out.get(Quantity::ZMode)) {
        let ci = point::hpdci(quantiles, HPDCI68, Some(zmode));
        out.set(Quantity::ZModeErr, 0.5 * ci.width());
    }
    if needs(Quantity::ZMinHpdci68) || needs(Quantity::ZMaxHpdci68) {
        let ci = point::hpdci(quantiles, HPDCI68, None);
        out.set(Quantity::ZMinHpdci68, ci.lower);
        out.set(Quantity::ZMaxHpdci68, ci.upper);
    }
    if needs(Quantity::ZMinHpdci95) || needs(Quantity::ZMaxHpdci95) {
        let ci = point::hpdci(quantiles, HPDCI95, None);
        out.set(Quantity::ZMinHpdci95, ci.lower);
        out.set(Quantity::ZMaxHpdci95, ci.upper);
    }

    out.retain(&keep);
    out
}
