//! Geographic input shapes.
//!
//! Callers hand in a loose [`CoordsQuery`] (every field optional, as it
//! arrives from a query string or CLI flags). It is validated into a
//! [`Coords`], either a single point or a bounding box, before any tile is
//! requested.

use std::fmt;

use crate::error::{DemError, Result};

/// A validated geographic bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub top_lat: f64,
    pub bot_lat: f64,
    pub left_lon: f64,
    pub right_lon: f64,
}

impl GeoBounds {
    /// Validate and build a bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidCoordinates`] if a value is not finite or out
    /// of range, or if the box is empty or inverted.
    pub fn new(top_lat: f64, bot_lat: f64, left_lon: f64, right_lon: f64) -> Result<Self> {
        check_lat("top_lat", top_lat)?;
        check_lat("bot_lat", bot_lat)?;
        check_lon("left_lon", left_lon)?;
        check_lon("right_lon", right_lon)?;

        if top_lat <= bot_lat {
            return Err(DemError::invalid_coordinates(format!(
                "top_lat ({}) must be greater than bot_lat ({})",
                top_lat, bot_lat
            )));
        }
        if right_lon <= left_lon {
            return Err(DemError::invalid_coordinates(format!(
                "right_lon ({}) must be greater than left_lon ({})",
                right_lon, left_lon
            )));
        }

        Ok(Self {
            top_lat,
            bot_lat,
            left_lon,
            right_lon,
        })
    }

    /// The whole-degree cell containing a point.
    pub(crate) fn enclosing_cell(lat: f64, lon: f64) -> Self {
        let bot = lat.floor();
        let left = lon.floor();
        Self {
            top_lat: bot + 1.0,
            bot_lat: bot,
            left_lon: left,
            right_lon: left + 1.0,
        }
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.bot_lat, self.top_lat, self.left_lon, self.right_lon
        )
    }
}

/// A validated request shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coords {
    Point { lat: f64, lon: f64 },
    Area(GeoBounds),
}

impl Coords {
    /// Validate a point.
    pub fn point(lat: f64, lon: f64) -> Result<Self> {
        check_lat("lat", lat)?;
        check_lon("lon", lon)?;
        Ok(Coords::Point { lat, lon })
    }

    pub fn area(top_lat: f64, bot_lat: f64, left_lon: f64, right_lon: f64) -> Result<Self> {
        GeoBounds::new(top_lat, bot_lat, left_lon, right_lon).map(Coords::Area)
    }
}

/// Unvalidated coordinates as supplied by a caller.
///
/// Presence of a field decides the shape, so `lat = 0.0` is a valid point.
/// When both a point and a box are present the point is used.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordsQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub top_lat: Option<f64>,
    pub bot_lat: Option<f64>,
    pub left_lon: Option<f64>,
    pub right_lon: Option<f64>,
}

impl CoordsQuery {
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            ..Self::default()
        }
    }

    pub fn area(top_lat: f64, bot_lat: f64, left_lon: f64, right_lon: f64) -> Self {
        Self {
            top_lat: Some(top_lat),
            bot_lat: Some(bot_lat),
            left_lon: Some(left_lon),
            right_lon: Some(right_lon),
            ..Self::default()
        }
    }

    /// Validate the query into a [`Coords`].
    pub fn validate(&self) -> Result<Coords> {
        Coords::try_from(self)
    }
}

impl TryFrom<&CoordsQuery> for Coords {
    type Error = DemError;

    fn try_from(query: &CoordsQuery) -> Result<Self> {
        if let (Some(lat), Some(lon)) = (query.lat, query.lon) {
            return Coords::point(lat, lon);
        }

        match (query.top_lat, query.bot_lat, query.left_lon, query.right_lon) {
            (Some(top), Some(bot), Some(left), Some(right)) => Coords::area(top, bot, left, right),
            _ => Err(DemError::invalid_coordinates(
                "expected lat/lon or top_lat/bot_lat/left_lon/right_lon",
            )),
        }
    }
}

impl From<Coords> for CoordsQuery {
    fn from(coords: Coords) -> Self {
        match coords {
            Coords::Point { lat, lon } => CoordsQuery::point(lat, lon),
            Coords::Area(b) => CoordsQuery::area(b.top_lat, b.bot_lat, b.left_lon, b.right_lon),
        }
    }
}

/// South-west corner of a 1° x 1° tile cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    pub lat: i32,
    pub lon: i32,
}

impl TileCoordinate {
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }
}

fn check_lat(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
        return Err(DemError::invalid_coordinates(format!(
            "{} must be within [-90, 90], got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_lon(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
        return Err(DemError::invalid_coordinates(format!(
            "{} must be within [-180, 180], got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_is_rejected() {
        let err = CoordsQuery::default().validate().unwrap_err();
        assert!(matches!(err, DemError::InvalidCoordinates { .. }));
    }

    #[test]
    fn test_zero_is_a_valid_point() {
        let coords = CoordsQuery::point(0.0, 0.0).validate().unwrap();
        assert_eq!(coords, Coords::Point { lat: 0.0, lon: 0.0 });
    }

    #[test]
    fn test_point_wins_over_area() {
        let query = CoordsQuery {
            lat: Some(10.5),
            lon: Some(20.5),
            ..CoordsQuery::area(40.0, 30.0, 0.0, 10.0)
        };
        assert!(matches!(query.validate().unwrap(), Coords::Point { .. }));
    }

    #[test]
    fn test_partial_area_is_rejected() {
        let query = CoordsQuery {
            top_lat: Some(1.0),
            bot_lat: Some(0.0),
            left_lon: Some(0.0),
            ..CoordsQuery::default()
        };
        assert!(query.validate().is_err());

        let lone_lat = CoordsQuery {
            lat: Some(1.0),
            ..CoordsQuery::default()
        };
        assert!(lone_lat.validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Coords::point(91.0, 0.0).is_err());
        assert!(Coords::point(0.0, -180.5).is_err());
        assert!(Coords::point(f64::NAN, 0.0).is_err());
        assert!(GeoBounds::new(1.0, 1.0, 0.0, 1.0).is_err());
        assert!(GeoBounds::new(1.0, 0.0, 2.0, 1.0).is_err());
        assert!(GeoBounds::new(45.5, 44.2, 6.3, 7.9).is_ok());
    }

    #[test]
    fn test_enclosing_cell() {
        let cell = GeoBounds::enclosing_cell(-12.3, -76.9);
        assert_eq!(cell.top_lat, -12.0);
        assert_eq!(cell.bot_lat, -13.0);
        assert_eq!(cell.left_lon, -77.0);
        assert_eq!(cell.right_lon, -76.0);
    }

    #[test]
    fn test_coords_to_query() {
        let coords = Coords::area(2.0, 1.0, 3.0, 4.0).unwrap();
        let query = CoordsQuery::from(coords);
        assert_eq!(query.validate().unwrap(), coords);
        assert_eq!(query.lat, None);
    }
}
