pub mod info;
pub mod list;
pub mod mosaic;
pub mod tiles;

use anyhow::{Context, Result};
use demgrid::{download::DownloadConfig, CoordsQuery, DemServiceBuilder, ProductConfig};
use std::path::PathBuf;

use crate::{CoordArgs, GlobalArgs};

impl CoordArgs {
    pub fn query(&self) -> CoordsQuery {
        CoordsQuery {
            lat: self.lat,
            lon: self.lon,
            top_lat: self.top,
            bot_lat: self.bottom,
            left_lon: self.left,
            right_lon: self.right,
        }
    }
}

impl GlobalArgs {
    /// The selected preset with `DEM_*` overrides applied.
    pub fn product_config(&self) -> Result<ProductConfig> {
        ProductConfig::preset(&self.product)
            .and_then(ProductConfig::apply_env)
            .context("Invalid product configuration")
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        self.data_dir
            .clone()
            .context("DEM_DATA_DIR environment variable not set. Use --data-dir or set DEM_DATA_DIR")
    }

    pub fn service_builder(&self) -> Result<DemServiceBuilder> {
        let mut builder = DemServiceBuilder::new(self.data_dir()?)
            .product(self.product_config()?)
            .cache_size(self.cache_size);

        if let Some(url) = &self.download_url {
            builder = builder.auto_download(DownloadConfig::new(url.clone()));
        }

        Ok(builder)
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// "N35 to N36, E138 to E139" for a tile's south-west corner.
pub fn coverage(lat: i32, lon: i32) -> String {
    let ns = |v: i32| if v >= 0 { 'N' } else { 'S' };
    let ew = |v: i32| if v >= 0 { 'E' } else { 'W' };
    format!(
        "{}{:02} to {}{:02}, {}{:03} to {}{:03}",
        ns(lat),
        lat.abs(),
        ns(lat + 1),
        (lat + 1).abs(),
        ew(lon),
        lon.abs(),
        ew(lon + 1),
        (lon + 1).abs()
    )
}
