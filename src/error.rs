//! Error types
//!
//! Every failure in the codec is a typed signal. The adaptive search consumes
//! [`EncodeError`] and retries with a different quantile count whenever
//! [`EncodeError::is_recoverable`] says so; everything else propagates.

use thiserror::Error;

#[cfg(not(feature = "std"))]
use alloc::string::String;

/// Errors building a quantile array or extracting one from a distribution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantileError {
    /// A quantile array needs at least the two support bounds
    #[error("quantile array needs at least 2 values, got {count}")]
    TooFewValues { count: usize },

    /// A quantile value is NaN or infinite
    #[error("quantile {index} is not finite")]
    NonFinite { index: usize },

    /// Quantile values must be non-decreasing
    #[error("quantile {index} decreases: {value} < {previous}")]
    NotMonotonic {
        index: usize,
        value: f64,
        previous: f64,
    },

    /// No positive-mass bin, or no finite sample
    #[error("distribution has no probability mass")]
    DegenerateDistribution,

    /// Histogram grid and density disagree, or the grid is too short
    #[error("invalid histogram grid: {grid_len} grid points for {density_len} density values")]
    InvalidGrid { grid_len: usize, density_len: usize },

    /// Requested number of quantiles is below 2
    #[error("cannot extract {requested} quantiles, at least 2 are required")]
    InvalidQuantileCount { requested: usize },
}

/// Errors encoding a quantile array into a packet
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("cannot fit {quantiles} quantiles in a {packet_length}-byte packet")]
    TooManyQuantilesForHeader {
        quantiles: usize,
        packet_length: usize,
    },

    /// An endpoint falls outside what the 16-bit endpoint code can express
    #[error("endpoint {value} is outside the encodable range [{min}, {max}]")]
    EndpointOutOfRange { value: f64, min: f64, max: f64 },

    /// The quantization step does not fit in one byte, even allowing escapes
    #[error("minimum usable epsilon code {code} exceeds 255; use fewer quantiles or a longer packet")]
    EpsilonUnrepresentable { code: u64 },

    /// An escaped delta needs more than 16 bits
    #[error("delta of {steps} steps does not fit in a 16-bit escape record")]
    DeltaOverflow { steps: u64 },

    #[error("payload of length {payload_len} does not fit in {capacity} payload bytes")]
    PayloadTooLong { payload_len: usize, capacity: usize },

    /// Validation decoded a different number of quantiles than were encoded
    #[error("packet decodes to {found} quantiles, expected {expected}")]
    QuantileCountMismatch { expected: usize, found: usize },

    /// Validation found an interior quantile shifted beyond tolerance
    #[error("quantile shift {shift} exceeds tolerance {tolerance}")]
    ToleranceExceeded { shift: f64, tolerance: f64 },

    #[error("packet length {len} must be a multiple of 4 and at least 8 bytes")]
    InvalidPacketLength { len: usize },

    #[error(transparent)]
    Quantiles(#[from] QuantileError),

    /// The adaptive search never produced a packet
    #[error("no encoding found after {iterations} attempts (last quantile count {quantiles})")]
    SearchExhausted { iterations: usize, quantiles: usize },
}

impl EncodeError {
    /// Whether a retry with a different number of quantiles may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EncodeError::TooManyQuantilesForHeader { .. }
                | EncodeError::EpsilonUnrepresentable { .. }
                | EncodeError::DeltaOverflow { .. }
                | EncodeError::PayloadTooLong { .. }
                | EncodeError::QuantileCountMismatch { .. }
                | EncodeError::ToleranceExceeded { .. }
        )
    }

    /// Whether the source distribution itself carries no data
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            EncodeError::Quantiles(QuantileError::DegenerateDistribution)
        )
    }
}

/// Errors decoding a packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input buffer too short to hold the header
    #[error("buffer too short: expected {expected}, found {found}")]
    BufferTooShort { expected: usize, found: usize },

    /// An escape marker without its two magnitude bytes
    #[error("escape record at payload offset {offset} is truncated")]
    TruncatedEscape { offset: usize },

    /// The all-zero sentinel packet
    #[error("packet holds no data")]
    NoData,
}

/// Errors reconstructing a distribution from quantiles
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconstructError {
    #[error(
        "decoded redshift range [{decoded_min:.3}, {decoded_max:.3}] exceeds the target grid \
         range [{grid_min:.3}, {grid_max:.3}]; use force_range to override"
    )]
    RangeExceeded {
        decoded_min: f64,
        decoded_max: f64,
        grid_min: f64,
        grid_max: f64,
    },

    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: &'static str },

    /// Truncation only makes sense against bounds the caller chose
    #[error("force_range requires an explicit grid or explicit min/max bounds")]
    ForceRangeWithoutBounds,

    #[error("cannot draw {count} samples")]
    InvalidSampleCount { count: usize },
}

/// Invalid encoder configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("packet length {len} must be a multiple of 4 and at least 8 bytes")]
    InvalidPacketLength { len: usize },

    #[error("initial quantile count {initial} must be in [2, {max}]")]
    InitialQuantiles { initial: usize, max: usize },

    #[error("tolerance must be finite and positive, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },

    #[error("iteration ceiling must be positive")]
    ZeroIterations,
}

/// A name that matches no known option
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown interpolation method '{0}', expected 'linear' or 'spline'")]
    UnknownInterpolation(String),

    #[error("unknown quantity '{0}'")]
    UnknownQuantity(String),
}

/// What went wrong on a batch row
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchErrorKind {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A batch failure tagged with the offending row
#[derive(Debug, Clone, PartialEq, Error)]
#[error("source {row}: {kind}")]
pub struct BatchError {
    pub row: usize,
    #[source]
    pub kind: BatchErrorKind,
}

impl BatchError {
    pub fn new(row: usize, kind: impl Into<BatchErrorKind>) -> Self {
        Self {
            row,
            kind: kind.into(),
        }
    }
}
