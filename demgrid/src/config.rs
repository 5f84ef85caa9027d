//! Elevation product configuration.
//!
//! A product describes how tiles of one elevation dataset are named and
//! encoded: the filename template, the folder prefix and extension, the byte
//! order of the samples and whether adjacent tiles share a boundary line.

use std::fmt;
use std::str::FromStr;

use crate::error::{DemError, Result};

/// Byte order of the 16-bit samples in a tile file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the machine running this code.
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn swapped(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => f.write_str("little"),
            ByteOrder::Big => f.write_str("big"),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = DemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => Err(DemError::InvalidConfig {
                reason: format!("unknown byte order '{}', expected 'little' or 'big'", other),
            }),
        }
    }
}

/// Naming and encoding of one elevation product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductConfig {
    /// Prefix prepended to every filename (a sub-directory or URL path).
    pub folder: String,
    /// Filename template using `{{NS}}`, `{{LAT}}`, `{{WE}}` and `{{LON}}`.
    pub template: String,
    /// Suffix appended after the rendered filename, e.g. `.hgt`.
    pub extension: String,
    /// Byte order of the samples.
    pub byte_order: ByteOrder,
    /// Upper-case the rendered filename (not the folder or extension).
    pub uppercase: bool,
    /// Adjacent tiles duplicate their shared boundary row/column.
    pub overlap: bool,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self::hgt()
    }
}

impl ProductConfig {
    /// SRTM `.hgt` tiles: `N35E138.hgt`, big-endian, overlapping edges.
    pub fn hgt() -> Self {
        Self {
            folder: String::new(),
            template: "{{NS}}{{LAT}}{{WE}}{{LON}}".to_string(),
            extension: ".hgt".to_string(),
            byte_order: ByteOrder::Big,
            uppercase: true,
            overlap: true,
        }
    }

    /// USGS 1 arc-second `.bil` tiles: `n35_e138_1arc_v3.bil`, little-endian, overlapping edges.
    pub fn bil() -> Self {
        Self {
            folder: String::new(),
            template: "{{NS}}{{LAT}}_{{WE}}{{LON}}_1arc_v3".to_string(),
            extension: ".bil".to_string(),
            byte_order: ByteOrder::Little,
            uppercase: false,
            overlap: true,
        }
    }

    /// Look up a preset by name (`hgt` or `bil`).
    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "hgt" | "srtm" => Ok(Self::hgt()),
            "bil" => Ok(Self::bil()),
            other => Err(DemError::InvalidConfig {
                reason: format!("unknown product '{}', expected 'hgt' or 'bil'", other),
            }),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_uppercase(mut self, uppercase: bool) -> Self {
        self.uppercase = uppercase;
        self
    }

    pub fn with_overlap(mut self, overlap: bool) -> Self {
        self.overlap = overlap;
        self
    }

    /// Build a product from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DEM_PRODUCT` | Preset name: "hgt" or "bil" | hgt |
    /// | `DEM_FOLDER` | Filename prefix | preset |
    /// | `DEM_TEMPLATE` | Filename template | preset |
    /// | `DEM_EXTENSION` | Filename suffix | preset |
    /// | `DEM_BYTE_ORDER` | "big" or "little" | preset |
    /// | `DEM_UPPERCASE` | "true" or "false" | preset |
    /// | `DEM_OVERLAP` | "true" or "false" | preset |
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidConfig`] if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self> {
        let product = match std::env::var("DEM_PRODUCT") {
            Ok(name) => Self::preset(&name)?,
            Err(_) => Self::hgt(),
        };
        product.apply_env()
    }

    /// Override fields from the `DEM_*` variables other than `DEM_PRODUCT`.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(folder) = std::env::var("DEM_FOLDER") {
            self.folder = folder;
        }
        if let Ok(template) = std::env::var("DEM_TEMPLATE") {
            self.template = template;
        }
        if let Ok(extension) = std::env::var("DEM_EXTENSION") {
            self.extension = extension;
        }
        if let Ok(order) = std::env::var("DEM_BYTE_ORDER") {
            self.byte_order = order.parse()?;
        }
        if let Ok(value) = std::env::var("DEM_UPPERCASE") {
            self.uppercase = parse_flag("DEM_UPPERCASE", &value)?;
        }
        if let Ok(value) = std::env::var("DEM_OVERLAP") {
            self.overlap = parse_flag("DEM_OVERLAP", &value)?;
        }
        Ok(self)
    }
}

/// Parse a boolean environment flag.
pub(crate) fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(DemError::InvalidConfig {
            reason: format!("{} must be true or false, got '{}'", name, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_byte_order() {
        let expected = if 1u16.to_ne_bytes()[0] == 1 {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        assert_eq!(ByteOrder::host(), expected);
        assert_ne!(ByteOrder::host(), ByteOrder::host().swapped());
    }

    #[test]
    fn test_parse_byte_order() {
        assert_eq!("big".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert_eq!("Little".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert!("middle".parse::<ByteOrder>().is_err());
    }

    #[test]
    fn test_presets() {
        let hgt = ProductConfig::hgt();
        assert_eq!(hgt.byte_order, ByteOrder::Big);
        assert!(hgt.uppercase);
        assert!(hgt.overlap);

        let bil = ProductConfig::preset("BIL").unwrap();
        assert_eq!(bil.byte_order, ByteOrder::Little);
        assert!(!bil.uppercase);
        assert_eq!(bil.extension, ".bil");

        assert!(ProductConfig::preset("tiff").is_err());
    }

    #[test]
    fn test_builder_methods() {
        let product = ProductConfig::hgt()
            .with_folder("tiles/")
            .with_overlap(false)
            .with_byte_order(ByteOrder::Little);
        assert_eq!(product.folder, "tiles/");
        assert!(!product.overlap);
        assert_eq!(product.byte_order, ByteOrder::Little);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }
}
