//! Tile filename utilities.
//!
//! Tile files are named after the **south-west corner** of the 1° × 1° cell
//! they cover. Names are rendered from a template containing four tokens:
//!
//! - `{{NS}}`: hemisphere letter for the latitude, `n` or `s`
//! - `{{LAT}}`: latitude magnitude, 2 digits, zero-padded
//! - `{{WE}}`: hemisphere letter for the longitude, `e` or `w`
//! - `{{LON}}`: longitude magnitude, 3 digits, zero-padded
//!
//! The standard SRTM convention is `{{NS}}{{LAT}}{{WE}}{{LON}}` upper-cased,
//! giving names such as `N35E138`.

use crate::config::ProductConfig;
use crate::coords::TileCoordinate;

pub const NS_TOKEN: &str = "{{NS}}";
pub const LAT_TOKEN: &str = "{{LAT}}";
pub const WE_TOKEN: &str = "{{WE}}";
pub const LON_TOKEN: &str = "{{LON}}";

/// Substitute the tile tokens of `template` for one cell.
///
/// # Examples
///
/// ```
/// use demgrid::{filename::render_template, TileCoordinate};
///
/// let cell = TileCoordinate::new(-12, -77);
/// assert_eq!(render_template("{{NS}}{{LAT}}{{WE}}{{LON}}", cell, false), "s12w077");
/// assert_eq!(render_template("{{NS}}{{LAT}}_{{WE}}{{LON}}_1arc_v3", cell, true), "S12_W077_1ARC_V3");
/// ```
pub fn render_template(template: &str, cell: TileCoordinate, uppercase: bool) -> String {
    let ns = if cell.lat < 0 { "s" } else { "n" };
    let we = if cell.lon < 0 { "w" } else { "e" };

    let name = template
        .replace(NS_TOKEN, ns)
        .replace(LAT_TOKEN, &format!("{:02}", cell.lat.unsigned_abs()))
        .replace(WE_TOKEN, we)
        .replace(LON_TOKEN, &format!("{:03}", cell.lon.unsigned_abs()));

    if uppercase {
        name.to_uppercase()
    } else {
        name
    }
}

/// Full address of a cell's tile for a product: folder, rendered filename, extension.
pub fn tile_address(product: &ProductConfig, cell: TileCoordinate) -> String {
    format!(
        "{}{}{}",
        product.folder,
        render_template(&product.template, cell, product.uppercase),
        product.extension
    )
}

/// Canonical SRTM filename for integer cell coordinates.
///
/// # Examples
///
/// ```
/// use demgrid::filename::coords_to_filename;
///
/// assert_eq!(coords_to_filename(35, 138), "N35E138.hgt");
/// assert_eq!(coords_to_filename(-13, -78), "S13W078.hgt");
/// ```
pub fn coords_to_filename(lat: i32, lon: i32) -> String {
    tile_address(&ProductConfig::hgt(), TileCoordinate::new(lat, lon))
}

/// Parse a canonical SRTM filename back to the cell's south-west corner.
///
/// # Arguments
///
/// * `filename` - The filename (with or without path, with or without extension)
///
/// # Examples
///
/// ```
/// use demgrid::filename::filename_to_lat_lon;
///
/// assert_eq!(filename_to_lat_lon("N35E138.hgt"), Some((35, 138)));
/// assert_eq!(filename_to_lat_lon("S12W077.hgt"), Some((-12, -77)));
/// assert_eq!(filename_to_lat_lon("/path/to/N00E000.hgt"), Some((0, 0)));
/// assert_eq!(filename_to_lat_lon("invalid"), None);
/// ```
pub fn filename_to_lat_lon(filename: &str) -> Option<(i32, i32)> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let name = name.split('.').next().unwrap_or(name);

    // N00E000
    if name.len() != 7 || !name.is_ascii() {
        return None;
    }

    let bytes = name.as_bytes();
    let lat_sign = match bytes[0] {
        b'N' | b'n' => 1,
        b'S' | b's' => -1,
        _ => return None,
    };
    let lon_sign = match bytes[3] {
        b'E' | b'e' => 1,
        b'W' | b'w' => -1,
        _ => return None,
    };

    let lat: i32 = name[1..3].parse().ok()?;
    let lon: i32 = name[4..7].parse().ok()?;

    Some((lat * lat_sign, lon * lon_sign))
}
