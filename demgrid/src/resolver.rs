//! Tile address resolution.
//!
//! Converts validated [`Coords`] into a [`TilePlan`]: every whole-degree cell
//! the request touches, ordered north to south then west to east, with the
//! address of its tile and the geometry the assembler and extractor need.

use tracing::debug;

use crate::config::ProductConfig;
use crate::coords::{Coords, GeoBounds, TileCoordinate};
use crate::filename::tile_address;

/// Whole-degree extent of a mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min_lat: i32,
    pub max_lat: i32,
    pub min_lon: i32,
    pub max_lon: i32,
}

impl Limits {
    /// Degrees of latitude covered.
    pub fn lat_span(&self) -> i32 {
        self.max_lat - self.min_lat
    }

    /// Degrees of longitude covered.
    pub fn lon_span(&self) -> i32 {
        self.max_lon - self.min_lon
    }
}

/// Everything needed to load and assemble one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    /// Cells in assembly order: latitude descending, then longitude ascending.
    pub tiles: Vec<TileCoordinate>,
    /// Tile address for each entry of `tiles`.
    pub addresses: Vec<String>,
    /// Tiles per row.
    pub h_squares: usize,
    /// Tile rows.
    pub v_squares: usize,
    pub limits: Limits,
    /// The exact area the caller asked for.
    pub requested_area: GeoBounds,
    /// Adjacent tiles share a boundary row/column.
    pub overlap: bool,
}

impl TilePlan {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Resolve the tiles covering `coords` for `product`.
///
/// A point resolves to its enclosing cell. A box is rounded outward to whole
/// degrees.
///
/// # Examples
///
/// ```
/// use demgrid::{plan_tiles, Coords, ProductConfig};
///
/// let coords = Coords::area(46.5, 44.5, 6.5, 7.5).unwrap();
/// let plan = plan_tiles(&coords, &ProductConfig::hgt());
/// assert_eq!(plan.addresses, vec![
///     "N46E006.hgt", "N46E007.hgt",
///     "N45E006.hgt", "N45E007.hgt",
///     "N44E006.hgt", "N44E007.hgt",
/// ]);
/// assert_eq!((plan.h_squares, plan.v_squares), (2, 3));
/// ```
pub fn plan_tiles(coords: &Coords, product: &ProductConfig) -> TilePlan {
    let (limits, requested_area) = match *coords {
        Coords::Point { lat, lon } => {
            let cell = GeoBounds::enclosing_cell(lat, lon);
            (whole_degrees(&cell), cell)
        }
        Coords::Area(area) => (whole_degrees(&area), area),
    };

    let mut tiles = Vec::new();
    for lat in (limits.min_lat..limits.max_lat).rev() {
        for lon in limits.min_lon..limits.max_lon {
            tiles.push(TileCoordinate::new(lat, lon));
        }
    }

    let addresses: Vec<String> = tiles.iter().map(|&cell| tile_address(product, cell)).collect();

    debug!(
        tiles = tiles.len(),
        min_lat = limits.min_lat,
        max_lat = limits.max_lat,
        min_lon = limits.min_lon,
        max_lon = limits.max_lon,
        "Resolved tile plan"
    );

    TilePlan {
        tiles,
        addresses,
        h_squares: limits.lon_span() as usize,
        v_squares: limits.lat_span() as usize,
        limits,
        requested_area,
        overlap: product.overlap,
    }
}

fn whole_degrees(area: &GeoBounds) -> Limits {
    Limits {
        min_lat: area.bot_lat.floor() as i32,
        max_lat: area.top_lat.ceil() as i32,
        min_lon: area.left_lon.floor() as i32,
        max_lon: area.right_lon.ceil() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_yields_enclosing_tile() {
        let coords = Coords::point(35.3606, 138.7274).unwrap();
        let plan = plan_tiles(&coords, &ProductConfig::hgt());

        assert_eq!(plan.addresses, vec!["N35E138.hgt"]);
        assert_eq!((plan.h_squares, plan.v_squares), (1, 1));
        assert_eq!(
            plan.limits,
            Limits {
                min_lat: 35,
                max_lat: 36,
                min_lon: 138,
                max_lon: 139
            }
        );
        assert_eq!(plan.requested_area.top_lat, 36.0);
        assert_eq!(plan.requested_area.left_lon, 138.0);
    }

    #[test]
    fn test_negative_point() {
        let coords = Coords::point(-12.05, -77.04).unwrap();
        let plan = plan_tiles(&coords, &ProductConfig::hgt());
        assert_eq!(plan.addresses, vec!["S13W078.hgt"]);
    }

    #[test]
    fn test_box_order_north_to_south_west_to_east() {
        let coords = Coords::area(1.5, -0.5, -0.5, 0.5).unwrap();
        let plan = plan_tiles(&coords, &ProductConfig::hgt());

        let cells: Vec<(i32, i32)> = plan.tiles.iter().map(|c| (c.lat, c.lon)).collect();
        assert_eq!(
            cells,
            vec![(1, -1), (1, 0), (0, -1), (0, 0), (-1, -1), (-1, 0)]
        );
        assert_eq!(plan.len(), 6);
        assert_eq!((plan.h_squares, plan.v_squares), (2, 3));
    }

    #[test]
    fn test_integral_bounds_are_not_expanded() {
        let coords = Coords::area(46.0, 44.0, 6.0, 8.0).unwrap();
        let plan = plan_tiles(&coords, &ProductConfig::hgt());
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.limits.max_lat, 46);
        assert_eq!(plan.limits.max_lon, 8);
    }

    #[test]
    fn test_product_naming_and_overlap() {
        let coords = Coords::point(45.2, 7.1).unwrap();
        let product = ProductConfig::bil().with_folder("usgs/").with_overlap(false);
        let plan = plan_tiles(&coords, &product);
        assert_eq!(plan.addresses, vec!["usgs/n45_e007_1arc_v3.bil"]);
        assert!(!plan.overlap);
    }
}
