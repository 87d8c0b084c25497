//! Packet decoding
//!
//! Decoding has no dependency on the encoder; the encoder calls back into
//! this module to validate what it produced.

use super::packet::{PacketHeader, ESCAPE_MARKER, HEADER_LEN};
use crate::error::DecodeError;
use crate::quantiles::QuantileArray;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// One delta record read from a payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeltaRecord {
    /// Delta in units of `eps`
    pub steps: u16,
    /// Whether the record used the three-byte escape form
    pub escaped: bool,
}

impl DeltaRecord {
    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        if self.escaped {
            3
        } else {
            1
        }
    }
}

/// Iterator over the delta records of a payload
///
/// Stops at the trailing zero padding: a zero byte ends the payload only
/// when every byte after it is zero as well.
#[derive(Clone, Debug)]
pub struct DeltaRecords<'a> {
    payload: &'a [u8],
    /// Index one past the last nonzero payload byte
    end: usize,
    offset: usize,
}

impl<'a> DeltaRecords<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        let end = payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        Self {
            payload,
            end,
            offset: 0,
        }
    }
}

impl Iterator for DeltaRecords<'_> {
    type Item = Result<DeltaRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }
        let byte = self.payload[self.offset];
        if byte != ESCAPE_MARKER {
            self.offset += 1;
            return Some(Ok(DeltaRecord {
                steps: byte as u16,
                escaped: false,
            }));
        }

        // The magnitude may legitimately end in zero bytes, so check against
        // the full payload rather than the nonzero end
        if self.offset + 3 > self.payload.len() {
            let offset = self.offset;
            self.offset = self.payload.len();
            return Some(Err(DecodeError::TruncatedEscape { offset }));
        }
        let steps = u16::from_be_bytes([
            self.payload[self.offset + 1],
            self.payload[self.offset + 2],
        ]);
        self.offset += 3;
        // An escape whose low byte is zero can reach past the nonzero end
        self.end = self.end.max(self.offset);
        Some(Ok(DeltaRecord {
            steps,
            escaped: true,
        }))
    }
}

/// Decode a packet into its quantile array.
///
/// The result holds `2 + number of delta records` values: the stored lower
/// bound, the accumulated interior quantiles and the stored upper bound.
///
/// # Errors
///
/// [`DecodeError::NoData`] for the all-zero sentinel,
/// [`DecodeError::BufferTooShort`] when the header is incomplete and
/// [`DecodeError::TruncatedEscape`] when an escape record runs off the end.
///
/// # Example
///
/// ```
/// use pdfpack::codec::decode;
///
/// // eps_code = 1, xmin_code = 550 (z = 0.1), xmax_code = 600 (z = 0.11)
/// let mut packet = vec![1, 0x26, 0x02, 0x58, 0x02];
/// packet.extend_from_slice(&[10, 255, 0x01, 0x2C, 5, 0, 0, 0]);
///
/// let q = decode(&packet).unwrap();
/// assert_eq!(q.len(), 5);
/// assert!((q.values()[1] - 0.1001).abs() < 1e-9);
/// assert!((q.values()[2] - 0.1031).abs() < 1e-9);
/// assert!((q.values()[3] - 0.10315).abs() < 1e-9);
/// ```
pub fn decode(packet: &[u8]) -> Result<QuantileArray, DecodeError> {
    let header = PacketHeader::read(packet)?;
    if packet.iter().all(|&b| b == 0) {
        return Err(DecodeError::NoData);
    }

    let eps = header.eps();
    let zmin = header.zmin();
    let zmax = header.zmax();

    let payload = &packet[HEADER_LEN..];
    let mut values = Vec::with_capacity(payload.len() + 2);
    values.push(zmin);
    let mut z = zmin;
    for record in DeltaRecords::new(payload) {
        z += record?.steps as f64 * eps;
        values.push(z);
    }
    values.push(zmax);

    Ok(QuantileArray::from_monotone(values))
}
