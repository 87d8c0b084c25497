//! Batch entry points over many distributions
//!
//! Rows are independent, so encoding and grid reconstruction run across
//! rows in parallel with the `parallel` feature. Errors carry the index of
//! the row that failed. Rows without data are encoded as the all-zero
//! sentinel, and decode to `None`.
//!
//! Entry points that draw random numbers share one caller-supplied
//! generator and always walk the rows in order.
//!
//! # Example
//!
//! ```
//! use pdfpack::batch::{decode_to_grid, encode_histograms};
//! use pdfpack::codec::AdaptiveEncoder;
//! use pdfpack::reconstruct::{GridSpec, ReconstructOptions};
//!
//! let grid: Vec<f64> = (0..=150).map(|i| i as f64 * 0.01).collect();
//! let flat: Vec<f64> = (0..=150)
//!     .map(|i| if (10..=30).contains(&i) { 1.0 } else { 0.0 })
//!     .collect();
//! let empty = vec![0.0; grid.len()];
//!
//! let encoder = AdaptiveEncoder::default();
//! let packets = encode_histograms(&grid, &[flat, empty], &encoder).unwrap();
//! assert!(packets[1].is_sentinel());
//!
//! let target = GridSpec::Explicit(grid.clone());
//! let pdfs = decode_to_grid(&packets, &target, ReconstructOptions::default()).unwrap();
//! assert!(pdfs[0].is_some());
//! assert!(pdfs[1].is_none());
//! ```

use crate::codec::{self, is_valid_packet_length, AdaptiveEncoder, Packet};
use crate::error::{BatchError, ConfigError, DecodeError, EncodeError};
use crate::estimators::{self, EstimatorConfig, PointEstimates, Quantity, FLAG_NO_DATA};
use crate::quantiles::{Histogram, QuantileArray, Samples};
use crate::reconstruct::{self, BinnedPdf, GridSpec, Interpolation, ReconstructOptions};
use crate::traits::QuantileSource;
use rand::Rng;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Apply `f` to every row index, in parallel when enabled
fn map_rows<T, F>(rows: usize, f: F) -> Result<Vec<T>, BatchError>
where
    T: Send,
    F: Fn(usize) -> Result<T, BatchError> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..rows).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..rows).map(f).collect()
    }
}

fn encode_row<S: QuantileSource + ?Sized>(
    encoder: &AdaptiveEncoder,
    row: usize,
    source: &S,
) -> Result<Packet, BatchError> {
    match encoder.encode(source) {
        Ok(outcome) => Ok(outcome.packet),
        Err(err) if err.is_degenerate() => {
            debug!(row, "no probability mass, emitting sentinel");
            Packet::sentinel(encoder.packet_length()).map_err(|e| BatchError::new(row, e))
        }
        Err(err) => Err(BatchError::new(row, err)),
    }
}

/// Encode one histogram per row, all sharing the bin centers in `grid`
pub fn encode_histograms<R>(
    grid: &[f64],
    rows: &[R],
    encoder: &AdaptiveEncoder,
) -> Result<Vec<Packet>, BatchError>
where
    R: AsRef<[f64]> + Sync,
{
    map_rows(rows.len(), |row| {
        let histogram = Histogram::new(grid, rows[row].as_ref())
            .map_err(|e| BatchError::new(row, EncodeError::from(e)))?;
        encode_row(encoder, row, &histogram)
    })
}

/// Encode one set of random draws per row; non-finite draws are ignored
pub fn encode_samples<R>(rows: &[R], encoder: &AdaptiveEncoder) -> Result<Vec<Packet>, BatchError>
where
    R: AsRef<[f64]> + Sync,
{
    map_rows(rows.len(), |row| {
        encode_row(encoder, row, &Samples::new(rows[row].as_ref()))
    })
}

fn decode_row(row: usize, packet: &Packet) -> Result<Option<QuantileArray>, BatchError> {
    match codec::decode(packet.as_bytes()) {
        Ok(quantiles) => Ok(Some(quantiles)),
        Err(DecodeError::NoData) => Ok(None),
        Err(err) => Err(BatchError::new(row, err)),
    }
}

/// Decode every packet to its quantile array
pub fn decode_quantiles(packets: &[Packet]) -> Result<Vec<Option<QuantileArray>>, BatchError> {
    map_rows(packets.len(), |row| decode_row(row, &packets[row]))
}

/// Decode every packet and rebuild its binned density on `grid`
///
/// A row whose support falls outside the grid fails with
/// `ReconstructError::RangeExceeded` unless `options.force_range` is set.
pub fn decode_to_grid(
    packets: &[Packet],
    grid: &GridSpec,
    options: ReconstructOptions,
) -> Result<Vec<Option<BinnedPdf>>, BatchError> {
    map_rows(packets.len(), |row| {
        decode_row(row, &packets[row])?
            .map(|q| reconstruct::to_grid(&q, grid, options))
            .transpose()
            .map_err(|e| BatchError::new(row, e))
    })
}

/// Decode every packet and evaluate its CDF at `points`
pub fn decode_to_cdf(
    packets: &[Packet],
    points: &[f64],
    method: Interpolation,
) -> Result<Vec<Option<Vec<f64>>>, BatchError> {
    map_rows(packets.len(), |row| {
        Ok(decode_row(row, &packets[row])?.map(|q| reconstruct::to_cdf(&q, points, method)))
    })
}

/// Decode every packet and draw `count` samples from it
pub fn decode_to_samples<G: Rng + ?Sized>(
    packets: &[Packet],
    count: usize,
    method: Interpolation,
    rng: &mut G,
) -> Result<Vec<Option<Vec<f64>>>, BatchError> {
    packets
        .iter()
        .enumerate()
        .map(|(row, packet)| {
            decode_row(row, packet)?
                .map(|q| reconstruct::to_samples(&q, count, method, &mut *rng))
                .transpose()
                .map_err(|e| BatchError::new(row, e))
        })
        .collect()
}

/// Point estimates for one row
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowEstimates {
    pub estimates: PointEstimates,
    /// [`FLAG_NO_DATA`] when the packet is the sentinel
    pub flags: u32,
}

impl RowEstimates {
    pub fn has_data(&self) -> bool {
        self.flags & FLAG_NO_DATA == 0
    }
}

/// Measure `requested` for every packet
///
/// Sentinel rows carry no estimates and have [`FLAG_NO_DATA`] set.
pub fn measure_packets<G: Rng + ?Sized>(
    packets: &[Packet],
    requested: &[Quantity],
    config: &EstimatorConfig,
    rng: &mut G,
) -> Result<Vec<RowEstimates>, BatchError> {
    let mut out = Vec::with_capacity(packets.len());
    for (row, packet) in packets.iter().enumerate() {
        let estimates = match decode_row(row, packet)? {
            Some(q) => RowEstimates {
                estimates: estimators::measure(&q, requested, config, rng),
                flags: 0,
            },
            None => {
                debug!(row, "packet holds no data");
                RowEstimates {
                    estimates: PointEstimates::new(),
                    flags: FLAG_NO_DATA,
                }
            }
        };
        out.push(estimates);
    }
    Ok(out)
}

/// Split a column of big-endian words into packets of `packet_length` bytes
///
/// A `packet_length` that is not a multiple of 4 of at least 8 bytes is
/// reported against row 0.
pub fn packets_from_column(words: &[i32], packet_length: usize) -> Result<Vec<Packet>, BatchError> {
    if !is_valid_packet_length(packet_length) {
        return Err(BatchError::new(
            0,
            ConfigError::InvalidPacketLength { len: packet_length },
        ));
    }
    let per_packet = packet_length / 4;
    words
        .chunks(per_packet)
        .enumerate()
        .map(|(row, chunk)| {
            if chunk.len() != per_packet {
                return Err(BatchError::new(
                    row,
                    DecodeError::BufferTooShort {
                        expected: packet_length,
                        found: chunk.len() * 4,
                    },
                ));
            }
            Packet::from_be_words(chunk).map_err(|e| BatchError::new(row, e))
        })
        .collect()
}

/// Flatten packets into one column of big-endian words
pub fn packets_to_column(packets: &[Packet]) -> Vec<i32> {
    packets.iter().flat_map(Packet::to_be_words).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EncoderConfig;
    use crate::error::{BatchErrorKind, ReconstructError};
    use crate::math;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid() -> Vec<f64> {
        math::linspace(0.0, 1.5, 151)
    }

    /// Gaussian cut off at 4 sigma
    fn gaussian(center: f64, sigma: f64) -> Vec<f64> {
        grid()
            .iter()
            .map(|&z| {
                let t = (z - center) / sigma;
                if t.abs() > 4.0 {
                    0.0
                } else {
                    (-0.5 * t * t).exp()
                }
            })
            .collect()
    }

    #[test]
    fn test_histogram_rows() {
        let rows = vec![gaussian(0.4, 0.05), vec![0.0; 151], gaussian(0.9, 0.1)];
        let encoder = AdaptiveEncoder::default();
        let packets = encode_histograms(&grid(), &rows, &encoder).unwrap();
        assert_eq!(packets.len(), 3);
        assert!(packets.iter().all(|p| p.len() == 80));
        assert!(!packets[0].is_sentinel());
        assert!(packets[1].is_sentinel());

        let quantiles = decode_quantiles(&packets).unwrap();
        assert!(quantiles[1].is_none());
        let median = quantiles[2].as_ref().unwrap().quantile_at(0.5);
        assert!((median - 0.9).abs() < 0.01, "{}", median);
    }

    #[test]
    fn test_mismatched_row_names_the_row() {
        let rows = vec![gaussian(0.4, 0.05), vec![1.0; 10]];
        let err = encode_histograms(&grid(), &rows, &AdaptiveEncoder::default()).unwrap_err();
        assert_eq!(err.row, 1);
        assert!(matches!(err.kind, BatchErrorKind::Encode(_)));
    }

    #[test]
    fn test_sample_rows() {
        let mut rng = StdRng::seed_from_u64(9);
        let draws: Vec<f64> = (0..500).map(|_| 0.3 + 0.2 * rng.random::<f64>()).collect();
        let rows = vec![draws, vec![f64::NAN; 4]];
        let encoder = AdaptiveEncoder::new(EncoderConfig::default().with_packet_length(40)).unwrap();
        let packets = encode_samples(&rows, &encoder).unwrap();
        assert_eq!(packets[0].len(), 40);
        assert!(packets[1].is_sentinel());
    }

    #[test]
    fn test_grid_range_is_checked_per_row() {
        let rows = vec![gaussian(0.4, 0.05), gaussian(1.2, 0.05)];
        let packets = encode_histograms(&grid(), &rows, &AdaptiveEncoder::default()).unwrap();
        let narrow = GridSpec::Step {
            step: 0.01,
            min: Some(0.0),
            max: Some(0.8),
        };

        let err = decode_to_grid(&packets, &narrow, ReconstructOptions::default()).unwrap_err();
        assert_eq!(err.row, 1);
        assert!(matches!(
            err.kind,
            BatchErrorKind::Reconstruct(ReconstructError::RangeExceeded { .. })
        ));

        let forced = ReconstructOptions::default().with_force_range(true);
        let pdfs = decode_to_grid(&packets, &narrow, forced).unwrap();
        assert!(pdfs.iter().all(|p| p.is_some()));
    }

    #[test]
    fn test_cdf_rows() {
        let rows = vec![vec![0.0; 151], gaussian(0.5, 0.05)];
        let packets = encode_histograms(&grid(), &rows, &AdaptiveEncoder::default()).unwrap();
        let cdfs = decode_to_cdf(&packets, &[0.0, 0.5, 1.5], Interpolation::Linear).unwrap();
        assert!(cdfs[0].is_none());
        let cdf = cdfs[1].as_ref().unwrap();
        assert_eq!(cdf[0], 0.0);
        assert!((cdf[1] - 0.5).abs() < 0.02);
        assert_eq!(cdf[2], 1.0);
    }

    #[test]
    fn test_measure_flags_sentinels() {
        let rows = vec![gaussian(0.6, 0.05), vec![0.0; 151]];
        let packets = encode_histograms(&grid(), &rows, &AdaptiveEncoder::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let rows = measure_packets(
            &packets,
            &[Quantity::ZMedian, Quantity::ZMode],
            &EstimatorConfig::default(),
            &mut rng,
        )
        .unwrap();

        assert!(rows[0].has_data());
        let zmode = rows[0].estimates.get(Quantity::ZMode).unwrap();
        assert!((zmode - 0.6).abs() < 0.02, "{}", zmode);
        assert_eq!(rows[1].flags, FLAG_NO_DATA);
        assert!(rows[1].estimates.is_empty());
    }

    #[test]
    fn test_sample_draws_skip_sentinels() {
        let rows = vec![vec![0.0; 151], gaussian(0.5, 0.05)];
        let packets = encode_histograms(&grid(), &rows, &AdaptiveEncoder::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let draws = decode_to_samples(&packets, 50, Interpolation::Linear, &mut rng).unwrap();
        assert!(draws[0].is_none());
        assert_eq!(draws[1].as_ref().map(Vec::len), Some(50));
    }

    #[test]
    fn test_word_column() {
        let rows = vec![gaussian(0.3, 0.04), vec![0.0; 151]];
        let packets = encode_histograms(&grid(), &rows, &AdaptiveEncoder::default()).unwrap();
        let column = packets_to_column(&packets);
        assert_eq!(column.len(), 2 * 20);
        assert_eq!(packets_from_column(&column, 80).unwrap(), packets);

        let err = packets_from_column(&column[..30], 80).unwrap_err();
        assert_eq!(err.row, 1);
    }

    #[test]
    fn test_word_column_rejects_bad_length() {
        let column = vec![0i32; 20];
        for len in [0, 4, 42] {
            let err = packets_from_column(&column, len).unwrap_err();
            assert_eq!(err.row, 0);
            assert_eq!(
                err.kind,
                BatchErrorKind::Config(ConfigError::InvalidPacketLength { len })
            );
        }
    }
}
