//! Adaptive quantile-count search
//!
//! The encoder walks the quantile count `M` in steps of two: down while no
//! encoding fits, up while encodings fit but leave payload bytes unused. The
//! first failure after a success ends the search on the last good packet, and
//! a hard iteration ceiling bounds the walk for inputs that never settle.

use super::encode::{encode, encode_validated, Encoded};
use super::packet::{is_valid_packet_length, Packet};
use crate::error::{ConfigError, EncodeError, QuantileError};
use crate::traits::QuantileSource;
use tracing::{debug, trace, warn};

/// Default packet length in bytes
pub const DEFAULT_PACKET_LENGTH: usize = 80;
/// Default tolerance for validated encodes
pub const DEFAULT_TOLERANCE: f64 = 0.001;
/// Default ceiling on encode attempts per source
pub const DEFAULT_MAX_ITERATIONS: usize = 256;

/// Quantile count the search starts from for a given packet length
fn default_initial_quantiles(packet_length: usize) -> usize {
    packet_length.saturating_sub(9).max(2)
}

/// Adaptive encoder settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncoderConfig {
    /// Packet length in bytes, a multiple of 4 and at least 8
    pub packet_length: usize,
    /// Quantile count of the first attempt
    pub initial_quantiles: usize,
    /// Decode each attempt and reject it when a quantile moves beyond `tolerance`
    pub validate: bool,
    pub tolerance: f64,
    /// Encode attempts allowed before falling back
    pub max_iterations: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            packet_length: DEFAULT_PACKET_LENGTH,
            initial_quantiles: default_initial_quantiles(DEFAULT_PACKET_LENGTH),
            validate: false,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl EncoderConfig {
    /// Set the packet length; the initial quantile count follows it
    pub fn with_packet_length(mut self, packet_length: usize) -> Self {
        self.packet_length = packet_length;
        self.initial_quantiles = default_initial_quantiles(packet_length);
        self
    }

    pub fn with_initial_quantiles(mut self, initial_quantiles: usize) -> Self {
        self.initial_quantiles = initial_quantiles;
        self
    }

    /// Enable validation against `tolerance`
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.validate = true;
        self.tolerance = tolerance;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check the settings are usable
    pub fn check(&self) -> Result<(), ConfigError> {
        if !is_valid_packet_length(self.packet_length) {
            return Err(ConfigError::InvalidPacketLength {
                len: self.packet_length,
            });
        }
        let max = self.packet_length - 3;
        if !(2..=max).contains(&self.initial_quantiles) {
            return Err(ConfigError::InitialQuantiles {
                initial: self.initial_quantiles,
                max,
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }
}

/// Why the search stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The payload filled the packet exactly
    Filled,
    /// A larger quantile count failed; the last good packet was kept
    FellBack,
    /// The iteration ceiling was reached; the best packet so far was kept
    IterationLimit,
}

/// Result of an adaptive encode
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeOutcome {
    pub packet: Packet,
    /// Quantile count of the chosen packet
    pub quantile_count: usize,
    pub payload_len: usize,
    /// Encode attempts made
    pub iterations: usize,
    pub termination: Termination,
}

impl EncodeOutcome {
    fn new(encoded: Encoded, iterations: usize, termination: Termination) -> Self {
        Self {
            packet: encoded.packet,
            quantile_count: encoded.quantile_count,
            payload_len: encoded.payload_len,
            iterations,
            termination,
        }
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

/// Finds the quantile count that best fills a fixed-size packet
///
/// # Example
///
/// ```
/// use pdfpack::codec::{decode, AdaptiveEncoder, EncoderConfig};
/// use pdfpack::quantiles::Histogram;
///
/// let grid: Vec<f64> = (0..=150).map(|i| i as f64 * 0.01).collect();
/// let density: Vec<f64> = (0..=150)
///     .map(|i| if (10..=30).contains(&i) { 1.0 } else { 0.0 })
///     .collect();
///
/// let encoder = AdaptiveEncoder::new(EncoderConfig::default()).unwrap();
/// let outcome = encoder.encode(&Histogram::new(&grid, &density).unwrap()).unwrap();
///
/// assert_eq!(outcome.packet.len(), 80);
/// assert!(outcome.payload_len <= 75);
/// let quantiles = decode(outcome.packet.as_bytes()).unwrap();
/// assert_eq!(quantiles.len(), outcome.quantile_count);
/// ```
#[derive(Clone, Debug)]
pub struct AdaptiveEncoder {
    config: EncoderConfig,
}

impl Default for AdaptiveEncoder {
    fn default() -> Self {
        Self {
            config: EncoderConfig::default(),
        }
    }
}

impl AdaptiveEncoder {
    pub fn new(config: EncoderConfig) -> Result<Self, ConfigError> {
        config.check()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn packet_length(&self) -> usize {
        self.config.packet_length
    }

    /// Run the search over `source`.
    ///
    /// # Errors
    ///
    /// A source without mass gives `EncodeError::Quantiles(DegenerateDistribution)`.
    /// [`EncodeError::SearchExhausted`] when no attempt succeeded before the
    /// quantile count dropped below 2 or the iteration ceiling was hit.
    pub fn encode<S: QuantileSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<EncodeOutcome, EncodeError> {
        if !source.has_mass() {
            return Err(QuantileError::DegenerateDistribution.into());
        }
        let mut search = Search::new(self, source);
        loop {
            if let Some(outcome) = search.step()? {
                return Ok(outcome);
            }
        }
    }

    /// Like [`encode`](Self::encode), but a source without mass yields the
    /// all-zero sentinel packet
    pub fn encode_or_sentinel<S: QuantileSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Packet, EncodeError> {
        match self.encode(source) {
            Ok(outcome) => Ok(outcome.packet),
            Err(err) if err.is_degenerate() => {
                debug!("source has no probability mass, emitting sentinel");
                Packet::sentinel(self.config.packet_length)
            }
            Err(err) => Err(err),
        }
    }

    fn attempt<S: QuantileSource + ?Sized>(
        &self,
        source: &S,
        count: usize,
    ) -> Result<Encoded, EncodeError> {
        let quantiles = source.quantiles(count)?;
        if self.config.validate {
            encode_validated(&quantiles, self.config.packet_length, self.config.tolerance)
        } else {
            encode(&quantiles, self.config.packet_length)
        }
    }
}

/// Search state for one source
struct Search<'a, S: ?Sized> {
    encoder: &'a AdaptiveEncoder,
    source: &'a S,
    count: usize,
    best: Option<Encoded>,
    iterations: usize,
}

impl<'a, S: QuantileSource + ?Sized> Search<'a, S> {
    fn new(encoder: &'a AdaptiveEncoder, source: &'a S) -> Self {
        Self {
            encoder,
            source,
            count: encoder.config.initial_quantiles,
            best: None,
            iterations: 0,
        }
    }

    /// One transition of the search; `Ok(None)` means keep going
    fn step(&mut self) -> Result<Option<EncodeOutcome>, EncodeError> {
        if self.iterations >= self.encoder.config.max_iterations {
            warn!(
                iterations = self.iterations,
                quantiles = self.count,
                "quantile search hit its iteration ceiling"
            );
            return match self.best.take() {
                Some(best) => Ok(Some(EncodeOutcome::new(
                    best,
                    self.iterations,
                    Termination::IterationLimit,
                ))),
                None => Err(EncodeError::SearchExhausted {
                    iterations: self.iterations,
                    quantiles: self.count,
                }),
            };
        }
        self.iterations += 1;

        match self.encoder.attempt(self.source, self.count) {
            Ok(encoded) if encoded.is_full() => {
                trace!(quantiles = self.count, "packet filled");
                Ok(Some(EncodeOutcome::new(
                    encoded,
                    self.iterations,
                    Termination::Filled,
                )))
            }
            Ok(encoded) => {
                trace!(
                    quantiles = self.count,
                    payload_len = encoded.payload_len,
                    "packet fits, trying more quantiles"
                );
                self.best = Some(encoded);
                self.count += 2;
                Ok(None)
            }
            Err(err) if err.is_recoverable() => {
                trace!(quantiles = self.count, error = %err, "encode attempt failed");
                if let Some(best) = self.best.take() {
                    debug!(
                        quantiles = best.quantile_count,
                        "falling back to last packet that fit"
                    );
                    return Ok(Some(EncodeOutcome::new(
                        best,
                        self.iterations,
                        Termination::FellBack,
                    )));
                }
                if self.count < 4 {
                    return Err(EncodeError::SearchExhausted {
                        iterations: self.iterations,
                        quantiles: self.count,
                    });
                }
                self.count -= 2;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
