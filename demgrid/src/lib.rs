//! # demgrid - Elevation Mosaic Library
//!
//! Assembles elevation rasters for arbitrary geographic areas from a grid of
//! one-degree binary elevation tiles (SRTM `.hgt`, USGS `.bil`, ...).
//!
//! ## Pipeline
//!
//! 1. **Resolve**: a point or bounding box becomes an ordered list of tile
//!    addresses ([`plan_tiles`]).
//! 2. **Load**: every tile is fetched concurrently from a [`TileSource`] and
//!    decoded with byte-order correction ([`tile::decode_tile`]).
//! 3. **Assemble**: tiles are stitched into one mosaic, dropping shared
//!    boundary lines when the product overlaps ([`mosaic::concat_tiles`]).
//! 4. **Crop**: the mosaic is cut to the requested area ([`window::extract_window`]).
//! 5. **Resample**: the window is bilinearly interpolated to the requested
//!    dimensions ([`resample::resample`]).
//!
//! Stages are chained as continuations on a single-threaded [`Promise`], so
//! slow fetches (downloads running through a [`Reactor`]) overlap while the
//! rest of the pipeline stays on one thread.
//!
//! ## Quick Start
//!
//! ```no_run
//! use demgrid::{CoordsQuery, DemServiceBuilder, ResamplePolicy};
//!
//! let service = DemServiceBuilder::new("/data/srtm").build()?;
//!
//! let query = CoordsQuery::area(46.1, 45.7, 6.8, 7.3);
//! let policy = ResamplePolicy::from_parts(Some(64), None, None)?;
//! let grid = service.get_dem_blocking(&query, policy)?;
//! println!("{} lines x {} columns", grid.lines, grid.columns);
//! # Ok::<(), demgrid::DemError>(())
//! ```
//!
//! ## Tile Format
//!
//! Tiles are headerless squares of signed 16-bit samples, north to south and
//! west to east. The edge length is inferred from the file size:
//!
//! - **1 arc-second**: 3601×3601 samples (~30m)
//! - **3 arc-second**: 1201×1201 samples (~90m)
//!
//! The byte order is a property of the product ([`ProductConfig`]). The
//! special value -32768 indicates void (no data).

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod coords;
#[cfg(feature = "download")]
pub mod download;
pub mod error;
pub mod filename;
pub mod mosaic;
pub mod promise;
pub mod reactor;
pub mod resample;
pub mod resolver;
pub mod service;
pub mod source;
pub mod tile;
pub mod window;

// Re-export main types at crate root for convenience
pub use aggregate::{all, all_settled, any};
pub use cache::{CacheStats, CachedSource, TileCache};
pub use config::{ByteOrder, ProductConfig};
pub use coords::{Coords, CoordsQuery, GeoBounds, TileCoordinate};
pub use error::{DemError, Result};
pub use promise::{Deferred, Next, Promise, Settled};
pub use reactor::Reactor;
pub use resample::ResamplePolicy;
pub use resolver::{plan_tiles, Limits, TilePlan};
pub use service::{DemService, DemServiceBuilder};
pub use source::{DirectorySource, MemorySource, TileBytes, TileSource};
pub use tile::{ElevationGrid, VOID_VALUE};
