//! Fixed-size packet codec
//!
//! A quantile array is stored as a 5-byte header holding the quantization
//! step and the two support bounds, followed by one delta record per
//! interior quantile:
//!
//! ```text
//! byte 0      eps_code         quantization step, eps = eps_code * 1e-5
//! bytes 1-2   xmin_code (LE)   zmin = xmin_code * 2e-4 - 0.01
//! bytes 3-4   xmax_code (LE)   zmax = xmax_code * 2e-4 - 0.01
//! bytes 5..   payload          delta records, zero padded
//! ```
//!
//! A delta record is either one byte `0..=254` or the escape marker `255`
//! followed by a big-endian `u16`.
//!
//! - [`encode`] / [`decode`]: one quantile array to and from one packet
//! - [`AdaptiveEncoder`]: picks the quantile count that best fills the packet
//!
//! `decode` does not depend on `encode`; the encoder decodes its own output
//! when asked to validate.
//!
//! # Example
//!
//! ```
//! use pdfpack::codec::{decode, AdaptiveEncoder};
//! use pdfpack::quantiles::Samples;
//!
//! let draws: Vec<f64> = (0..500).map(|i| 0.8 + 0.0004 * i as f64).collect();
//! let outcome = AdaptiveEncoder::default()
//!     .encode(&Samples::new(&draws))
//!     .unwrap();
//!
//! let quantiles = decode(outcome.packet.as_bytes()).unwrap();
//! assert!((quantiles.quantile_at(0.5) - 0.9).abs() < 1e-3);
//! ```

mod adaptive;
mod decode;
mod encode;
mod packet;

pub use adaptive::{
    AdaptiveEncoder, EncodeOutcome, EncoderConfig, Termination, DEFAULT_MAX_ITERATIONS,
    DEFAULT_PACKET_LENGTH, DEFAULT_TOLERANCE,
};
pub use decode::{decode, DeltaRecord, DeltaRecords};
pub use encode::{encode, encode_validated, validate, Encoded, EncodingParameters};
pub use packet::{
    endpoint_value, is_valid_packet_length, max_endpoint, min_endpoint, payload_capacity, Packet,
    PacketHeader, ENDPOINT_OFFSET, ENDPOINT_STEP, EPS_UNIT, ESCAPE_MARKER, HEADER_LEN,
    MAX_DIRECT_DELTA, MIN_PACKET_LEN,
};
