//! Packet encoding
//!
//! Encoding picks one set of [`EncodingParameters`] per packet, walks the
//! interior quantiles emitting delta records, and optionally decodes the
//! result to check it against a tolerance.

use super::decode::decode;
use super::packet::{
    endpoint_value, is_valid_packet_length, max_endpoint, min_endpoint, payload_capacity, Packet,
    PacketHeader, ENDPOINT_OFFSET, ENDPOINT_STEP, EPS_UNIT, ESCAPE_MARKER, MAX_DIRECT_DELTA,
};
use crate::error::EncodeError;
use crate::math;
use crate::quantiles::QuantileArray;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Largest gap, in `eps` units, the one-byte records must cover
const DIRECT_RANGE: f64 = MAX_DIRECT_DELTA as f64;
/// Largest gap, in `eps` units, an escape record can cover
const ESCAPE_RANGE: f64 = u16::MAX as f64;

/// Quantization parameters chosen once per packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingParameters {
    /// Interior quantization step in units of 1e-5
    pub eps_code: u8,
    /// Lower support bound code (rounded down)
    pub xmin_code: u16,
    /// Upper support bound code (rounded up)
    pub xmax_code: u16,
}

/// A successful encoding
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub packet: Packet,
    /// Bytes of payload used, at most `packet.len() - 5`
    pub payload_len: usize,
    /// Number of quantiles encoded
    pub quantile_count: usize,
    pub params: EncodingParameters,
}

impl Encoded {
    /// Payload bytes the packet could hold
    pub fn capacity(&self) -> usize {
        payload_capacity(self.packet.len())
    }

    /// Whether the payload fills the packet exactly
    pub fn is_full(&self) -> bool {
        self.payload_len == self.capacity()
    }
}

fn endpoint_code(value: f64, code: f64) -> Result<u16, EncodeError> {
    if !(0.0..=u16::MAX as f64).contains(&code) {
        return Err(EncodeError::EndpointOutOfRange {
            value,
            min: min_endpoint(),
            max: max_endpoint(),
        });
    }
    Ok(code as u16)
}

/// Smallest step code that spans `gap` in `range` steps
fn step_code(gap: f64, range: f64) -> u64 {
    math::ceil(gap / EPS_UNIT / range).max(0.0) as u64
}

impl EncodingParameters {
    /// Choose parameters for `quantiles` in a packet of `packet_length` bytes.
    ///
    /// `eps` must resolve every interior gap except the largest
    /// `(L - (M + 3)) / 2` in one byte, resolve the very largest gap in two
    /// bytes, be at least 1e-5, and fit in one byte itself.
    pub fn select(quantiles: &QuantileArray, packet_length: usize) -> Result<Self, EncodeError> {
        if !is_valid_packet_length(packet_length) {
            return Err(EncodeError::InvalidPacketLength { len: packet_length });
        }
        let m = quantiles.len();
        if m + 3 > packet_length {
            return Err(EncodeError::TooManyQuantilesForHeader {
                quantiles: m,
                packet_length,
            });
        }

        let zmin = quantiles.min();
        let zmax = quantiles.max();
        let xmin_code = endpoint_code(
            zmin,
            math::floor((zmin + ENDPOINT_OFFSET) / ENDPOINT_STEP),
        )?;
        let xmax_code = endpoint_code(
            zmax,
            math::ceil((zmax + ENDPOINT_OFFSET) / ENDPOINT_STEP),
        )?;

        let max_big_gaps = (packet_length - (m + 3)) / 2;

        // The last quantile is stored in the header, so its gap never
        // becomes a delta record
        let values = quantiles.values();
        let mut gaps: Vec<f64> = values[..m - 1]
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect();
        gaps.sort_by(|a, b| a.total_cmp(b));

        let threshold = if max_big_gaps < gaps.len() {
            gaps[gaps.len() - max_big_gaps - 1]
        } else {
            0.0
        };
        let direct_code = step_code(threshold, DIRECT_RANGE);
        if direct_code > u8::MAX as u64 {
            return Err(EncodeError::EpsilonUnrepresentable { code: direct_code });
        }

        let max_gap = gaps.last().copied().unwrap_or(0.0);
        let escape_code = step_code(max_gap, ESCAPE_RANGE);

        let code = direct_code.max(escape_code).max(1);
        if code > u8::MAX as u64 {
            return Err(EncodeError::EpsilonUnrepresentable { code });
        }

        Ok(Self {
            eps_code: code as u8,
            xmin_code,
            xmax_code,
        })
    }

    /// Quantization step
    pub fn eps(&self) -> f64 {
        self.eps_code as f64 * EPS_UNIT
    }

    /// Lower bound as it will be decoded
    pub fn zmin(&self) -> f64 {
        endpoint_value(self.xmin_code)
    }

    /// Upper bound as it will be decoded
    pub fn zmax(&self) -> f64 {
        endpoint_value(self.xmax_code)
    }

    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            eps_code: self.eps_code,
            xmin_code: self.xmin_code,
            xmax_code: self.xmax_code,
        }
    }

    /// Encode `quantiles` with these parameters.
    ///
    /// Deltas are taken from the running *reconstructed* value so encoder
    /// and decoder accumulate identically. A delta that rounds below zero is
    /// stored as zero.
    pub fn encode(
        &self,
        quantiles: &QuantileArray,
        packet_length: usize,
    ) -> Result<Encoded, EncodeError> {
        if !is_valid_packet_length(packet_length) {
            return Err(EncodeError::InvalidPacketLength { len: packet_length });
        }
        let values = quantiles.values();
        let m = values.len();
        let eps = self.eps();

        let capacity = payload_capacity(packet_length);
        let mut payload = Vec::with_capacity(capacity);
        let mut prev = self.zmin();
        for &z in &values[1..m - 1] {
            let steps = math::round((z - prev) / eps).max(0.0) as u64;
            if steps <= MAX_DIRECT_DELTA as u64 {
                payload.push(steps as u8);
            } else {
                let wide =
                    u16::try_from(steps).map_err(|_| EncodeError::DeltaOverflow { steps })?;
                payload.push(ESCAPE_MARKER);
                payload.extend_from_slice(&wide.to_be_bytes());
            }
            prev += steps as f64 * eps;
        }

        if payload.len() > capacity {
            return Err(EncodeError::PayloadTooLong {
                payload_len: payload.len(),
                capacity,
            });
        }

        Ok(Encoded {
            packet: Packet::assemble(packet_length, self.header(), &payload),
            payload_len: payload.len(),
            quantile_count: m,
            params: *self,
        })
    }
}

/// Encode `quantiles` into a packet of `packet_length` bytes.
///
/// # Errors
///
/// Fails when the quantiles cannot fit: too many for the header, a
/// quantization step that cannot be stored in one byte, an escape delta
/// above 16 bits, or a payload longer than `packet_length - 5`.
///
/// # Example
///
/// ```
/// use pdfpack::codec::{decode, encode};
/// use pdfpack::quantiles::QuantileArray;
///
/// let values: Vec<f64> = (0..=50).map(|i| 0.2 + 0.012 * i as f64).collect();
/// let quantiles = QuantileArray::new(values).unwrap();
///
/// let encoded = encode(&quantiles, 80).unwrap();
/// assert_eq!(encoded.packet.len(), 80);
///
/// let decoded = decode(encoded.packet.as_bytes()).unwrap();
/// assert_eq!(decoded.len(), quantiles.len());
/// ```
pub fn encode(quantiles: &QuantileArray, packet_length: usize) -> Result<Encoded, EncodeError> {
    EncodingParameters::select(quantiles, packet_length)?.encode(quantiles, packet_length)
}

/// Encode and then decode the result, failing if any interior quantile
/// moved by more than `tolerance`.
pub fn encode_validated(
    quantiles: &QuantileArray,
    packet_length: usize,
    tolerance: f64,
) -> Result<Encoded, EncodeError> {
    let encoded = encode(quantiles, packet_length)?;
    validate(quantiles, &encoded.packet, tolerance)?;
    Ok(encoded)
}

/// Check that `packet` decodes back to `original` within `tolerance`.
///
/// Only interior quantiles are compared; the endpoints carry their own
/// 2e-4 header resolution.
pub fn validate(
    original: &QuantileArray,
    packet: &Packet,
    tolerance: f64,
) -> Result<(), EncodeError> {
    let expected = original.len();
    let recovered = decode(packet.as_bytes())
        .map_err(|_| EncodeError::QuantileCountMismatch { expected, found: 0 })?;
    if recovered.len() != expected {
        return Err(EncodeError::QuantileCountMismatch {
            expected,
            found: recovered.len(),
        });
    }

    let shift = original.values()[1..expected - 1]
        .iter()
        .zip(&recovered.values()[1..expected - 1])
        .map(|(a, b)| math::abs(a - b))
        .fold(0.0, f64::max);
    if shift > tolerance {
        return Err(EncodeError::ToleranceExceeded { shift, tolerance });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantiles(values: &[f64]) -> QuantileArray {
        QuantileArray::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_round_trip_within_resolution() {
        let values: Vec<f64> = (0..=50).map(|i| 0.2 + 0.012 * i as f64).collect();
        let q = quantiles(&values);
        let encoded = encode(&q, 80).unwrap();
        assert!(encoded.payload_len <= 75);

        let eps = encoded.params.eps();
        let decoded = decode(encoded.packet.as_bytes()).unwrap();
        assert_eq!(decoded.len(), q.len());
        for (i, (a, b)) in q.values().iter().zip(decoded.values()).enumerate().skip(1) {
            if i == q.len() - 1 {
                break;
            }
            assert!((a - b).abs() <= eps / 2.0 + 1e-12, "q[{}]: {} vs {}", i, a, b);
        }
        // Endpoints are rounded outward to the 2e-4 grid
        assert!(decoded.min() <= q.min() + 1e-12);
        assert!(q.min() - decoded.min() <= 2e-4 + 1e-12);
        assert!(decoded.max() >= q.max() - 1e-12);
        assert!(decoded.max() - q.max() <= 2e-4 + 1e-12);
    }

    #[test]
    fn test_escape_record_layout() {
        let q = quantiles(&[0.10005, 0.10015, 0.10315, 0.1032, 0.2]);
        let encoded = encode(&q, 12).unwrap();
        assert_eq!(encoded.params.eps_code, 1);
        assert_eq!(encoded.params.xmin_code, 550);
        assert_eq!(encoded.payload_len, 5);
        assert_eq!(
            &encoded.packet.payload()[..5],
            &[15, ESCAPE_MARKER, 0x01, 0x2C, 5]
        );
        assert_eq!(&encoded.packet.payload()[5..], &[0, 0]);
        assert_eq!(encoded.packet.as_bytes()[0], 1);
    }

    #[test]
    fn test_never_produces_sentinel() {
        let q = quantiles(&[0.0, 0.0, 0.0]);
        let encoded = encode(&q, 8).unwrap();
        assert!(!encoded.packet.is_sentinel());
        assert!(encoded.params.eps_code >= 1);
    }

    #[test]
    fn test_too_many_quantiles() {
        let values: Vec<f64> = (0..10).map(|i| i as f64 * 0.01).collect();
        assert_eq!(
            encode(&quantiles(&values), 12),
            Err(EncodeError::TooManyQuantilesForHeader {
                quantiles: 10,
                packet_length: 12
            })
        );
    }

    #[test]
    fn test_invalid_packet_length() {
        let q = quantiles(&[0.1, 0.2, 0.3]);
        assert_eq!(
            encode(&q, 10),
            Err(EncodeError::InvalidPacketLength { len: 10 })
        );
    }

    #[test]
    fn test_epsilon_unrepresentable() {
        // No escapes affordable and gaps of 1.0 need eps > 2.55e-3
        let q = quantiles(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let err = encode(&q, 8).unwrap_err();
        assert!(matches!(err, EncodeError::EpsilonUnrepresentable { code } if code > 255));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_escapes_absorb_large_gaps() {
        // One escape affordable: the single large gap goes into it
        let q = quantiles(&[0.1, 0.9, 0.901, 0.902, 1.0]);
        let encoded = encode(&q, 12).unwrap();
        assert_eq!(encoded.packet.payload()[0], ESCAPE_MARKER);
        assert_eq!(encoded.payload_len, 5);
    }

    #[test]
    fn test_endpoint_out_of_range() {
        let q = quantiles(&[-1.0, 0.5, 1.0]);
        assert!(matches!(
            encode(&q, 8),
            Err(EncodeError::EndpointOutOfRange { value, .. }) if value == -1.0
        ));
        let q = quantiles(&[0.5, 1.0, 20.0]);
        assert!(matches!(
            encode(&q, 8),
            Err(EncodeError::EndpointOutOfRange { value, .. }) if value == 20.0
        ));
    }

    #[test]
    fn test_payload_too_long() {
        // Forcing the finest step makes every delta an escape
        let params = EncodingParameters {
            eps_code: 1,
            xmin_code: 550,
            xmax_code: 1550,
        };
        let q = quantiles(&[0.1, 0.11, 0.12, 0.13, 0.3]);
        assert_eq!(
            params.encode(&q, 8),
            Err(EncodeError::PayloadTooLong {
                payload_len: 9,
                capacity: 3
            })
        );
    }

    #[test]
    fn test_delta_overflow() {
        let params = EncodingParameters {
            eps_code: 1,
            xmin_code: 550,
            xmax_code: 10050,
        };
        let q = quantiles(&[0.1, 1.1, 1.9]);
        assert!(matches!(
            params.encode(&q, 8),
            Err(EncodeError::DeltaOverflow { steps }) if steps > 65535
        ));
    }

    #[test]
    fn test_validation_tolerance() {
        let q = quantiles(&[0.10005, 0.100153, 0.103153, 0.2]);
        assert!(encode_validated(&q, 12, 1e-3).is_ok());
        assert!(matches!(
            encode_validated(&q, 12, 1e-9),
            Err(EncodeError::ToleranceExceeded { .. })
        ));
    }

    #[test]
    fn test_validation_catches_trailing_zero_delta() {
        // The last interior delta is zero and reads back as padding
        let q = quantiles(&[0.10005, 0.1002, 0.1002, 0.2]);
        let encoded = encode(&q, 8).unwrap();
        assert_eq!(encoded.payload_len, 2);
        assert_eq!(
            encode_validated(&q, 8, 1e-3),
            Err(EncodeError::QuantileCountMismatch {
                expected: 4,
                found: 3
            })
        );
    }
}
