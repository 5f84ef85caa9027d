//! Basic example demonstrating demgrid library usage.
//!
//! Run with: cargo run --example basic -- /path/to/hgt/files

use demgrid::{CoordsQuery, DemError, DemServiceBuilder, ResamplePolicy};
use std::env;

fn main() -> Result<(), DemError> {
    // Get data directory from command line
    let data_dir = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/hgt/files");
        std::process::exit(1);
    });

    let builder = DemServiceBuilder::new(&data_dir).cache_size(10);
    let service = builder.build()?;

    let areas = [
        ("Mount Fuji, Japan", CoordsQuery::area(35.45, 35.25, 138.6, 138.85)),
        ("Matterhorn, Switzerland", CoordsQuery::area(46.05, 45.9, 7.55, 7.75)),
        ("Whole tile around Lima", CoordsQuery::point(-12.05, -77.04)),
    ];

    // Mesh builders usually want 2^n segments per side.
    let policy = ResamplePolicy::from_parts(Some(64), None, None)?;

    println!("Elevation mosaics:");
    println!("{:-<50}", "");

    for (name, query) in &areas {
        match service.get_dem_blocking(query, policy) {
            Ok(grid) => {
                let stats = grid.stats();
                println!(
                    "{}: {}x{} samples, {}m to {}m",
                    name,
                    grid.lines,
                    grid.columns,
                    stats.min.unwrap_or_default(),
                    stats.max.unwrap_or_default()
                );
            }
            Err(DemError::TileFetchFailed { address, .. }) => {
                println!("{}: tile {} not available locally", name, address);
            }
            Err(e) => {
                println!("{}: error - {}", name, e);
            }
        }
    }

    if let Some(stats) = builder.cache_stats() {
        println!("\nCache statistics:");
        println!("  Cached tiles: {}", stats.entry_count);
        println!("  Hits: {}", stats.hit_count);
        println!("  Misses: {}", stats.miss_count);
        println!("  Hit rate: {:.1}%", stats.hit_rate() * 100.0);
    }

    Ok(())
}
