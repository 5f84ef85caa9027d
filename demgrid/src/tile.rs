//! Tile decoding and the elevation grid type.
//!
//! A tile file is a headerless square of signed 16-bit samples, stored row by
//! row from north to south and west to east within a row. The edge length is
//! inferred from the byte count (1201 for 3 arc-second data, 3601 for
//! 1 arc-second data). The byte order depends on the product.

use std::fmt;

use tracing::warn;

use crate::config::ByteOrder;
use crate::error::{DemError, Result};

/// Value indicating no data (void) in SRTM files
pub const VOID_VALUE: i16 = -32768;

/// A row-major raster of elevations in meters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElevationGrid {
    pub samples: Vec<i16>,
    pub lines: usize,
    pub columns: usize,
}

impl ElevationGrid {
    /// Build a grid, checking that the sample count matches the dimensions.
    pub fn new(samples: Vec<i16>, lines: usize, columns: usize) -> Result<Self> {
        if samples.len() != lines * columns {
            return Err(DemError::TileSizeMismatch {
                index: 0,
                expected: lines * columns,
                found: samples.len(),
            });
        }
        Ok(Self {
            samples,
            lines,
            columns,
        })
    }

    /// Sample at `line` (0 = north) and `column` (0 = west).
    pub fn get(&self, line: usize, column: usize) -> Option<i16> {
        if line >= self.lines || column >= self.columns {
            return None;
        }
        self.samples.get(line * self.columns + column).copied()
    }

    /// One scan line.
    pub fn row(&self, line: usize) -> &[i16] {
        let start = line * self.columns;
        &self.samples[start..start + self.columns]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summary statistics. Void samples count as negatives.
    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats {
            min: None,
            max: None,
            negatives: 0,
            first_negative: None,
        };
        for (index, &value) in self.samples.iter().enumerate() {
            stats.min = Some(stats.min.map_or(value, |m: i16| m.min(value)));
            stats.max = Some(stats.max.map_or(value, |m: i16| m.max(value)));
            if value < 0 {
                stats.negatives += 1;
                stats.first_negative.get_or_insert(index);
            }
        }
        stats
    }

    /// Samples as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Summary of a grid's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    pub min: Option<i16>,
    pub max: Option<i16>,
    pub negatives: usize,
    pub first_negative: Option<usize>,
}

/// A negative sample found while decoding.
///
/// Negative values usually mean a void or a byte-order mistake. They are
/// passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowWarning {
    pub address: String,
    /// Index of the first negative sample.
    pub index: usize,
    pub value: i16,
}

impl fmt::Display for OverflowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tile {} has negative elevation {} at sample {}",
            self.address, self.value, self.index
        )
    }
}

/// Output of [`decode_tile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTile {
    pub grid: ElevationGrid,
    pub overflow: Option<OverflowWarning>,
}

/// Edge length of a square tile holding `len` bytes of 16-bit samples.
pub fn edge_length(len: usize) -> Option<usize> {
    if len == 0 || len % 2 != 0 {
        return None;
    }
    let count = len / 2;
    let edge = (count as f64).sqrt().round() as usize;
    (edge * edge == count).then_some(edge)
}

/// Decode raw tile bytes stored in `byte_order`.
///
/// Bytes are read as native 16-bit values and swapped when `byte_order`
/// differs from the host's. The first negative sample, if any, is logged and
/// reported in [`DecodedTile::overflow`].
///
/// # Errors
///
/// Returns [`DemError::InvalidTileSize`] if `bytes` is not a square grid of
/// 16-bit samples.
///
/// # Examples
///
/// ```
/// use demgrid::{tile::decode_tile, ByteOrder};
///
/// // 2x2 big-endian tile: 1, 2, 3, 256
/// let bytes = [0, 1, 0, 2, 0, 3, 1, 0];
/// let tile = decode_tile("N00E000.hgt", &bytes, ByteOrder::Big).unwrap();
/// assert_eq!(tile.grid.samples, vec![1, 2, 3, 256]);
/// assert_eq!((tile.grid.lines, tile.grid.columns), (2, 2));
/// assert!(tile.overflow.is_none());
/// ```
pub fn decode_tile(address: &str, bytes: &[u8], byte_order: ByteOrder) -> Result<DecodedTile> {
    let edge = edge_length(bytes.len()).ok_or_else(|| DemError::InvalidTileSize {
        address: address.to_string(),
        size: bytes.len(),
    })?;

    let swap = byte_order != ByteOrder::host();
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let value = i16::from_ne_bytes([pair[0], pair[1]]);
            if swap {
                value.swap_bytes()
            } else {
                value
            }
        })
        .collect();

    let overflow = samples
        .iter()
        .position(|&value| value < 0)
        .map(|index| OverflowWarning {
            address: address.to_string(),
            index,
            value: samples[index],
        });

    if let Some(warning) = &overflow {
        warn!(
            address = %warning.address,
            index = warning.index,
            value = warning.value,
            "Negative elevation in tile, check the product byte order"
        );
    }

    Ok(DecodedTile {
        grid: ElevationGrid {
            samples,
            lines: edge,
            columns: edge,
        },
        overflow,
    })
}
