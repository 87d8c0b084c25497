//! Packet layout constants, header and packet buffer

use crate::error::{DecodeError, EncodeError};

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Redshift units per unit of `eps_code`
pub const EPS_UNIT: f64 = 1e-5;
/// Redshift units per unit of an endpoint code
pub const ENDPOINT_STEP: f64 = 2e-4;
/// Offset subtracted when mapping an endpoint code to a redshift
pub const ENDPOINT_OFFSET: f64 = 0.01;
/// Bytes taken by `eps_code`, `xmin_code` and `xmax_code`
pub const HEADER_LEN: usize = 5;
/// Largest delta a one-byte record can carry
pub const MAX_DIRECT_DELTA: u8 = 254;
/// Marker byte that introduces a three-byte escape record
pub const ESCAPE_MARKER: u8 = 255;
/// Shortest packet that can hold a header and keep the 4-byte alignment
pub const MIN_PACKET_LEN: usize = 8;

/// Whether `len` is a usable packet length: 4-byte aligned and at least 8 bytes
pub fn is_valid_packet_length(len: usize) -> bool {
    len >= MIN_PACKET_LEN && len % 4 == 0
}

/// Payload bytes available in a packet of `len` bytes
pub fn payload_capacity(len: usize) -> usize {
    len.saturating_sub(HEADER_LEN)
}

/// Redshift represented by an endpoint code
#[inline]
pub fn endpoint_value(code: u16) -> f64 {
    code as f64 * ENDPOINT_STEP - ENDPOINT_OFFSET
}

/// Lowest redshift an endpoint code can express
pub fn min_endpoint() -> f64 {
    endpoint_value(0)
}

/// Highest redshift an endpoint code can express
pub fn max_endpoint() -> f64 {
    endpoint_value(u16::MAX)
}

/// The three header fields of a packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub eps_code: u8,
    pub xmin_code: u16,
    pub xmax_code: u16,
}

impl PacketHeader {
    /// Quantization step for interior deltas
    pub fn eps(&self) -> f64 {
        self.eps_code as f64 * EPS_UNIT
    }

    /// Lower support bound as stored
    pub fn zmin(&self) -> f64 {
        endpoint_value(self.xmin_code)
    }

    /// Upper support bound as stored
    pub fn zmax(&self) -> f64 {
        endpoint_value(self.xmax_code)
    }

    /// Serialize into the first [`HEADER_LEN`] bytes of `out`
    pub(crate) fn write(&self, out: &mut [u8]) {
        out[0] = self.eps_code;
        out[1..3].copy_from_slice(&self.xmin_code.to_le_bytes());
        out[3..5].copy_from_slice(&self.xmax_code.to_le_bytes());
    }

    /// Parse from the start of `bytes`
    pub fn read(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::BufferTooShort {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        Ok(Self {
            eps_code: bytes[0],
            xmin_code: u16::from_le_bytes([bytes[1], bytes[2]]),
            xmax_code: u16::from_le_bytes([bytes[3], bytes[4]]),
        })
    }
}

/// A fixed-size compressed distribution
///
/// The all-zero packet is the "no data" sentinel; a successful encode never
/// produces it because `eps_code` is at least 1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<u8>", into = "Vec<u8>")
)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    /// The "no data" sentinel of the given length
    pub fn sentinel(len: usize) -> Result<Self, EncodeError> {
        if !is_valid_packet_length(len) {
            return Err(EncodeError::InvalidPacketLength { len });
        }
        Ok(Self {
            bytes: vec![0; len],
        })
    }

    /// Wrap raw packet bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::BufferTooShort {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Assemble a packet of `len` bytes from a header and a payload that fits
    pub(crate) fn assemble(len: usize, header: PacketHeader, payload: &[u8]) -> Self {
        debug_assert!(HEADER_LEN + payload.len() <= len);
        let mut bytes = vec![0; len];
        header.write(&mut bytes);
        bytes[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
        Self { bytes }
    }

    /// Rebuild a packet from a column of big-endian 32-bit words
    pub fn from_be_words(words: &[i32]) -> Result<Self, DecodeError> {
        let bytes = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        Self::from_bytes(bytes)
    }

    /// The packet as big-endian 32-bit words, for column-oriented storage
    ///
    /// Packets built by this crate always have a length divisible by 4;
    /// a trailing partial word from foreign bytes is zero padded.
    pub fn to_be_words(&self) -> Vec<i32> {
        self.bytes
            .chunks(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                i32::from_be_bytes(word)
            })
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Packet length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether this is the all-zero "no data" sentinel
    pub fn is_sentinel(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn header(&self) -> PacketHeader {
        // Constructors guarantee the header bytes exist
        PacketHeader {
            eps_code: self.bytes[0],
            xmin_code: u16::from_le_bytes([self.bytes[1], self.bytes[2]]),
            xmax_code: u16::from_le_bytes([self.bytes[3], self.bytes[4]]),
        }
    }

    /// The delta records and trailing zero padding
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Payload bytes actually used, ignoring trailing zero padding
    pub fn payload_len(&self) -> usize {
        self.payload()
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1)
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<Vec<u8>> for Packet {
    type Error = DecodeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl From<Packet> for Vec<u8> {
    fn from(packet: Packet) -> Self {
        packet.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_lengths() {
        assert!(is_valid_packet_length(8));
        assert!(is_valid_packet_length(80));
        assert!(!is_valid_packet_length(4));
        assert!(!is_valid_packet_length(81));
        assert!(Packet::sentinel(82).is_err());
    }

    #[test]
    fn test_endpoint_codes() {
        assert!((endpoint_value(0) + 0.01).abs() < 1e-15);
        assert!((endpoint_value(50) - 0.0).abs() < 1e-15);
        assert!((endpoint_value(550) - 0.1).abs() < 1e-12);
        assert!(max_endpoint() > 13.0);
        assert!(min_endpoint() < 0.0);
    }

    #[test]
    fn test_header_layout() {
        let header = PacketHeader {
            eps_code: 7,
            xmin_code: 0x0102,
            xmax_code: 0xA0B0,
        };
        let packet = Packet::assemble(12, header, &[9, 8]);
        assert_eq!(
            packet.as_bytes(),
            &[7, 0x02, 0x01, 0xB0, 0xA0, 9, 8, 0, 0, 0, 0, 0]
        );
        assert_eq!(packet.header(), header);
        assert_eq!(PacketHeader::read(packet.as_bytes()), Ok(header));
        assert_eq!(packet.payload_len(), 2);
        assert!((header.eps() - 7e-5).abs() < 1e-18);
    }

    #[test]
    fn test_sentinel() {
        let packet = Packet::sentinel(16).unwrap();
        assert!(packet.is_sentinel());
        assert_eq!(packet.len(), 16);
        assert_eq!(packet.payload_len(), 0);
        assert_eq!(packet.to_be_words(), vec![0; 4]);
    }

    #[test]
    fn test_be_words() {
        let bytes = vec![1, 2, 3, 4, 0xFF, 0, 0, 0x80];
        let packet = Packet::from_bytes(bytes.clone()).unwrap();
        let words = packet.to_be_words();
        assert_eq!(words, vec![0x01020304, i32::from_be_bytes([0xFF, 0, 0, 0x80])]);
        assert_eq!(Packet::from_be_words(&words).unwrap().into_bytes(), bytes);
    }

    #[test]
    fn test_from_bytes_too_short() {
        assert_eq!(
            Packet::from_bytes(vec![1, 2]),
            Err(DecodeError::BufferTooShort {
                expected: 5,
                found: 2
            })
        );
    }

    #[test]
    fn test_try_from_checks_header() {
        assert_eq!(
            Packet::try_from(vec![1u8, 2, 3]),
            Err(DecodeError::BufferTooShort {
                expected: HEADER_LEN,
                found: 3
            })
        );
        let packet = Packet::try_from(vec![3u8, 0, 0, 1, 0, 7, 0, 0]).unwrap();
        assert_eq!(packet.payload(), &[7, 0, 0]);
        assert_eq!(Vec::<u8>::from(packet).len(), 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_short_bytes() {
        use serde::de::value::{Error as ValueError, SeqDeserializer};
        use serde::de::IntoDeserializer;
        use serde::Deserialize;

        fn from_seq(bytes: Vec<u8>) -> Result<Packet, ValueError> {
            let de: SeqDeserializer<_, ValueError> = bytes.into_deserializer();
            Packet::deserialize(de)
        }

        let err = from_seq(vec![1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("too short"), "{}", err);
        assert!(from_seq(Vec::new()).is_err());

        let packet = from_seq(vec![3, 0, 0, 1, 0, 7, 0, 0]).unwrap();
        assert_eq!(packet.header().eps_code, 3);
        assert_eq!(packet.payload_len(), 1);
    }
}
