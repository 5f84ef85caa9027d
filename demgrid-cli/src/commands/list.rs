use anyhow::{bail, Result};
use demgrid::filename::filename_to_lat_lon;
use demgrid::tile::edge_length;
use demgrid::DirectorySource;
use std::fs;

use super::{coverage, format_size};
use crate::GlobalArgs;

fn resolution_label(edge: Option<usize>) -> &'static str {
    match edge {
        Some(3601) => "1\"",
        Some(1201) => "3\"",
        Some(_) => "other",
        None => "???",
    }
}

pub fn run(global: &GlobalArgs) -> Result<()> {
    let dir = global.data_dir()?;
    let product = global.product_config()?;

    if !dir.exists() {
        bail!("Data directory does not exist: {}", dir.display());
    }

    let source = DirectorySource::new(&dir);
    let tiles = source.scan(&product.extension);

    if tiles.is_empty() {
        println!("No {} files found in: {}", product.extension, dir.display());
        return Ok(());
    }

    let mut total_size: u64 = 0;
    let mut unreadable = 0;

    println!("{:<28} {:>6} {:>30}", "TILE", "RES", "COVERAGE");
    println!("{}", "-".repeat(66));

    for name in &tiles {
        let path = dir.join(name);
        // Zipped tiles report their archive size and are not unpacked here.
        let (size, edge) = match fs::metadata(&path) {
            Ok(meta) => (meta.len(), edge_length(meta.len() as usize)),
            Err(_) => {
                let zipped = fs::metadata(dir.join(format!("{}.zip", name)))
                    .map(|m| m.len())
                    .unwrap_or(0);
                (zipped, None)
            }
        };
        total_size += size;
        if edge.is_none() {
            unreadable += 1;
        }

        let cover = filename_to_lat_lon(name)
            .map(|(lat, lon)| coverage(lat, lon))
            .unwrap_or_else(|| "Unknown".to_string());

        println!("{:<28} {:>6} {:>30}", name, resolution_label(edge), cover);
    }

    println!();
    println!("Summary:");
    println!("  Total tiles: {}", tiles.len());
    if unreadable > 0 {
        println!("  Zipped or unrecognised size: {}", unreadable);
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_label() {
        assert_eq!(resolution_label(edge_length(1201 * 1201 * 2)), "3\"");
        assert_eq!(resolution_label(edge_length(3601 * 3601 * 2)), "1\"");
        assert_eq!(resolution_label(edge_length(3 * 3 * 2)), "other");
        assert_eq!(resolution_label(edge_length(7)), "???");
    }
}
