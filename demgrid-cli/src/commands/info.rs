use anyhow::{bail, Context, Result};
use demgrid::filename::filename_to_lat_lon;
use demgrid::tile::{decode_tile, edge_length};
use demgrid::VOID_VALUE;
use std::path::{Path, PathBuf};

use super::{coverage, format_size};
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs, tile: &str) -> Result<()> {
    let product = global.product_config()?;

    let tile_path = if Path::new(tile).is_file() {
        PathBuf::from(tile)
    } else {
        let name = if tile.to_lowercase().ends_with(&product.extension.to_lowercase()) {
            tile.to_string()
        } else {
            format!("{}{}", tile, product.extension)
        };
        global.data_dir()?.join(name)
    };

    if !tile_path.is_file() {
        bail!("Tile not found: {}", tile_path.display());
    }

    let filename = tile_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| tile.to_string());

    let bytes = std::fs::read(&tile_path)
        .with_context(|| format!("Failed to read tile: {}", tile_path.display()))?;
    let decoded =
        decode_tile(&filename, &bytes, product.byte_order).context("Failed to decode tile")?;
    let edge = edge_length(bytes.len()).unwrap_or(decoded.grid.lines);
    let stats = decoded.grid.stats();
    let voids = decoded
        .grid
        .samples
        .iter()
        .filter(|&&v| v == VOID_VALUE)
        .count();

    println!("Tile: {}", filename);
    println!("Path: {}", tile_path.display());
    println!();
    println!("Samples: {}x{}", edge, edge);
    println!("Byte order: {}", product.byte_order);
    match filename_to_lat_lon(&filename) {
        Some((lat, lon)) => println!("Coverage: {}", coverage(lat, lon)),
        None => println!("Coverage: Unknown"),
    }
    println!("File size: {}", format_size(bytes.len() as u64));
    println!();

    if let (Some(min), Some(max)) = (stats.min, stats.max) {
        println!("Min elevation: {}m", min);
        println!("Max elevation: {}m", max);
    }
    if stats.negatives > 0 {
        let pct = stats.negatives as f64 / decoded.grid.len() as f64 * 100.0;
        println!("Negative samples: {} ({:.1}%)", stats.negatives, pct);
        if let Some(index) = stats.first_negative {
            println!("First negative at: line {}, column {}", index / edge, index % edge);
        }
    }
    if voids > 0 {
        println!("Void samples: {}", voids);
    }

    Ok(())
}
