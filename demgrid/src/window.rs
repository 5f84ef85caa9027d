//! Window extraction.
//!
//! Crops a mosaic covering whole degrees down to the fractional area that was
//! requested. Each bound is converted to a ratio of the mosaic's extent and
//! scaled by the line or column count, rounding to the nearest index; the
//! result can be off by one cell at each edge.

use crate::coords::GeoBounds;
use crate::resolver::Limits;
use crate::tile::ElevationGrid;

/// Half-open index ranges of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl Window {
    /// Window of a `lines` x `columns` mosaic spanning `limits` that covers `area`.
    pub fn locate(lines: usize, columns: usize, limits: &Limits, area: &GeoBounds) -> Self {
        let lat_span = f64::from(limits.lat_span());
        let lon_span = f64::from(limits.lon_span());
        let max_lat = f64::from(limits.max_lat);
        let min_lon = f64::from(limits.min_lon);

        let max_lat_ratio = (max_lat - area.top_lat) / lat_span;
        let min_lat_ratio = (max_lat - area.bot_lat) / lat_span;
        let min_lon_ratio = (area.left_lon - min_lon) / lon_span;
        let max_lon_ratio = (area.right_lon - min_lon) / lon_span;

        let start_line = scaled_index(lines, max_lat_ratio);
        let end_line = scaled_index(lines, min_lat_ratio).max(start_line);
        let start_column = scaled_index(columns, min_lon_ratio);
        let end_column = scaled_index(columns, max_lon_ratio).max(start_column);

        Self {
            start_line,
            end_line,
            start_column,
            end_column,
        }
    }

    fn lines(&self) -> usize {
        self.end_line - self.start_line
    }

    fn columns(&self) -> usize {
        self.end_column - self.start_column
    }
}

/// `round(dimension * ratio)` clamped to `[0, dimension]`.
fn scaled_index(dimension: usize, ratio: f64) -> usize {
    let index = (dimension as f64 * ratio).round();
    if index.is_nan() || index <= 0.0 {
        0
    } else {
        (index as usize).min(dimension)
    }
}

/// Crop `mosaic` to the part of `limits` covered by `area`.
pub fn extract_window(mosaic: &ElevationGrid, limits: &Limits, area: &GeoBounds) -> ElevationGrid {
    let window = Window::locate(mosaic.lines, mosaic.columns, limits, area);

    let mut samples = Vec::with_capacity(window.lines() * window.columns());
    for line in window.start_line..window.end_line {
        samples.extend_from_slice(&mosaic.row(line)[window.start_column..window.end_column]);
    }

    ElevationGrid {
        samples,
        lines: window.lines(),
        columns: window.columns(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            min_lat: 10,
            max_lat: 12,
            min_lon: 20,
            max_lon: 22,
        }
    }

    fn mosaic(lines: usize, columns: usize) -> ElevationGrid {
        let samples = (0..lines * columns).map(|i| i as i16).collect();
        ElevationGrid::new(samples, lines, columns).unwrap()
    }

    #[test]
    fn test_full_extent_keeps_everything() {
        let grid = mosaic(5, 5);
        let area = GeoBounds::new(12.0, 10.0, 20.0, 22.0).unwrap();
        assert_eq!(extract_window(&grid, &limits(), &area), grid);
    }

    #[test]
    fn test_quarter_window() {
        let grid = mosaic(8, 8);
        // North-east quadrant.
        let area = GeoBounds::new(12.0, 11.0, 21.0, 22.0).unwrap();
        let window = extract_window(&grid, &limits(), &area);

        assert_eq!((window.lines, window.columns), (4, 4));
        assert_eq!(window.row(0), &[4, 5, 6, 7]);
        assert_eq!(window.get(3, 3), Some(31));
    }

    #[test]
    fn test_fractional_bounds_round_to_nearest() {
        let grid = mosaic(10, 10);
        let area = GeoBounds::new(11.77, 10.4, 20.26, 21.5).unwrap();
        let window = Window::locate(grid.lines, grid.columns, &limits(), &area);

        // 10 * 0.115 = 1.15, 10 * 0.8 = 8, 10 * 0.13 = 1.3, 10 * 0.75 = 7.5
        assert_eq!(window.start_line, 1);
        assert_eq!(window.end_line, 8);
        assert_eq!(window.start_column, 1);
        assert_eq!(window.end_column, 8);
        assert_eq!(extract_window(&grid, &limits(), &area).len(), 7 * 7);
    }

    #[test]
    fn test_area_outside_limits_is_clamped() {
        let area = GeoBounds::new(13.0, 9.0, 19.0, 23.0).unwrap();
        let window = Window::locate(4, 4, &limits(), &area);
        assert_eq!((window.start_line, window.end_line), (0, 4));
        assert_eq!((window.start_column, window.end_column), (0, 4));
    }
}
