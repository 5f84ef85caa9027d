//! Mosaic assembly.
//!
//! Tiles arrive in plan order (north to south, then west to east) and are
//! stitched into one row-major raster. With `overlap` on, adjacent tiles
//! repeat their shared boundary line, so every tile after the first in a row
//! drops its first column and every tile row after the first drops its first
//! scan line.

use crate::error::{DemError, Result};
use crate::tile::ElevationGrid;

/// Concatenate `h_squares` x `v_squares` tiles into one grid.
///
/// # Errors
///
/// - [`DemError::TileCountMismatch`] if `tiles.len() != h_squares * v_squares`
/// - [`DemError::TileSizeMismatch`] if a tile's dimensions differ from the first tile's
///
/// # Examples
///
/// ```
/// use demgrid::{mosaic::concat_tiles, ElevationGrid};
///
/// let west = ElevationGrid::new(vec![1, 2, 3, 4], 2, 2).unwrap();
/// let east = ElevationGrid::new(vec![2, 5, 4, 6], 2, 2).unwrap();
///
/// let mosaic = concat_tiles(2, 1, &[west, east], true).unwrap();
/// assert_eq!((mosaic.lines, mosaic.columns), (2, 3));
/// assert_eq!(mosaic.samples, vec![1, 2, 5, 3, 4, 6]);
/// ```
pub fn concat_tiles(
    h_squares: usize,
    v_squares: usize,
    tiles: &[ElevationGrid],
    overlap: bool,
) -> Result<ElevationGrid> {
    let expected = h_squares * v_squares;
    if tiles.len() != expected {
        return Err(DemError::TileCountMismatch {
            expected,
            found: tiles.len(),
        });
    }
    let Some(first) = tiles.first() else {
        return Ok(ElevationGrid::default());
    };

    let (tile_lines, tile_columns) = (first.lines, first.columns);
    for (index, tile) in tiles.iter().enumerate() {
        if tile.lines != tile_lines || tile.columns != tile_columns {
            return Err(DemError::TileSizeMismatch {
                index,
                expected: tile_lines * tile_columns,
                found: tile.len(),
            });
        }
    }

    let shared = usize::from(overlap);
    let lines = tile_lines * v_squares - shared * (v_squares - 1);
    let columns = tile_columns * h_squares - shared * (h_squares - 1);

    let mut samples = Vec::with_capacity(lines * columns);
    for tile_row in 0..v_squares {
        let first_line = if tile_row > 0 { shared } else { 0 };
        for line in first_line..tile_lines {
            for tile_column in 0..h_squares {
                let first_column = if tile_column > 0 { shared } else { 0 };
                let tile = &tiles[tile_row * h_squares + tile_column];
                samples.extend_from_slice(&tile.row(line)[first_column..]);
            }
        }
    }

    debug_assert_eq!(samples.len(), lines * columns);
    Ok(ElevationGrid {
        samples,
        lines,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An N x N tile filled with `base + line * 10 + column`.
    fn tile(n: usize, base: i16) -> ElevationGrid {
        let samples = (0..n * n)
            .map(|i| base + (i / n) as i16 * 10 + (i % n) as i16)
            .collect();
        ElevationGrid::new(samples, n, n).unwrap()
    }

    #[test]
    fn test_two_by_two_with_overlap() {
        let n = 3;
        let tiles = [tile(n, 0), tile(n, 100), tile(n, 200), tile(n, 300)];
        let mosaic = concat_tiles(2, 2, &tiles, true).unwrap();

        assert_eq!((mosaic.lines, mosaic.columns), (2 * n - 1, 2 * n - 1));
        assert_eq!(mosaic.len(), (2 * n - 1).pow(2));
        // North-west corner from the first tile, south-east from the last.
        assert_eq!(mosaic.get(0, 0), Some(0));
        assert_eq!(mosaic.get(4, 4), Some(322));
        // The shared column comes from the western tile.
        assert_eq!(mosaic.row(0), &[0, 1, 2, 101, 102]);
        // The shared line comes from the northern tile row.
        assert_eq!(mosaic.get(2, 0), Some(20));
        assert_eq!(mosaic.get(3, 0), Some(210));
    }

    #[test]
    fn test_two_by_two_without_overlap() {
        let n = 3;
        let tiles = [tile(n, 0), tile(n, 100), tile(n, 200), tile(n, 300)];
        let mosaic = concat_tiles(2, 2, &tiles, false).unwrap();

        assert_eq!((mosaic.lines, mosaic.columns), (2 * n, 2 * n));
        assert_eq!(mosaic.row(0), &[0, 1, 2, 100, 101, 102]);
        assert_eq!(mosaic.row(3), &[200, 201, 202, 300, 301, 302]);
        assert_eq!(mosaic.get(5, 5), Some(322));
    }

    #[test]
    fn test_single_tile_is_unchanged() {
        let only = tile(4, 7);
        let mosaic = concat_tiles(1, 1, std::slice::from_ref(&only), true).unwrap();
        assert_eq!(mosaic, only);
    }

    #[test]
    fn test_tile_count_mismatch() {
        let err = concat_tiles(2, 2, &[tile(2, 0)], true).unwrap_err();
        assert!(matches!(
            err,
            DemError::TileCountMismatch {
                expected: 4,
                found: 1
            }
        ));
    }

    #[test]
    fn test_tile_size_mismatch() {
        let err = concat_tiles(2, 1, &[tile(3, 0), tile(2, 0)], false).unwrap_err();
        assert!(matches!(err, DemError::TileSizeMismatch { index: 1, .. }));
    }
}
