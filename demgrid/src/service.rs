//! Elevation pipeline service.
//!
//! [`DemService`] wires a product configuration, a [`TileSource`] and a
//! [`Reactor`] together. [`DemService::get_dem`] validates the request, then
//! chains tile resolution, concurrent loading, mosaic assembly, windowing and
//! resampling as continuations on one promise.
//!
//! ```no_run
//! use demgrid::{CoordsQuery, DemServiceBuilder, ResamplePolicy};
//!
//! let service = DemServiceBuilder::new("/data/srtm").cache_size(16).build()?;
//!
//! let query = CoordsQuery::area(46.2, 45.8, 6.9, 7.4);
//! let grid = service.get_dem_blocking(&query, ResamplePolicy::Identity)?;
//! println!("{} x {}", grid.lines, grid.columns);
//! # Ok::<(), demgrid::DemError>(())
//! ```
//!
//! # Auto-Download Feature
//!
//! When compiled with the `download` feature, the builder can fetch missing
//! tiles from a remote mirror instead of reading only the data directory.
//!
//! ```ignore
//! use demgrid::{DemServiceBuilder, download::DownloadConfig};
//!
//! let service = DemServiceBuilder::new("/data/srtm")
//!     .auto_download(DownloadConfig::new("https://example.com/srtm/").with_suffix(".zip"))
//!     .build()?;
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::aggregate::all;
use crate::cache::{CacheStats, CachedSource, TileCache};
use crate::config::ProductConfig;
use crate::coords::CoordsQuery;
use crate::error::{DemError, Result};
use crate::mosaic::concat_tiles;
use crate::promise::Promise;
use crate::reactor::Reactor;
use crate::resample::{resample, ResamplePolicy};
use crate::resolver::{plan_tiles, TilePlan};
use crate::source::{DirectorySource, TileSource};
use crate::tile::{decode_tile, ElevationGrid};
use crate::window::extract_window;

#[cfg(feature = "download")]
use crate::download::{DownloadConfig, HttpSource};

/// Default number of tiles kept in the shared cache.
pub const DEFAULT_CACHE_SIZE: u64 = 100;

/// Parameters shared by the stages of one request.
struct PipelineContext {
    plan: TilePlan,
    policy: ResamplePolicy,
}

impl PipelineContext {
    /// Mosaic, crop and resample the decoded tiles.
    fn assemble(&self, tiles: Vec<ElevationGrid>) -> Result<ElevationGrid> {
        let plan = &self.plan;
        let mosaic = concat_tiles(plan.h_squares, plan.v_squares, &tiles, plan.overlap)?;
        let window = extract_window(&mosaic, &plan.limits, &plan.requested_area);
        debug!(
            mosaic_lines = mosaic.lines,
            mosaic_columns = mosaic.columns,
            lines = window.lines,
            columns = window.columns,
            "Extracted window"
        );
        resample(window, self.policy)
    }
}

/// Assembles elevation grids for geographic areas.
///
/// The service owns single-threaded promises and is therefore `!Send`. Build
/// one per thread from a shared [`DemServiceBuilder`].
pub struct DemService {
    product: ProductConfig,
    source: Box<dyn TileSource>,
    reactor: Rc<Reactor>,
}

impl DemService {
    /// Create a service reading tiles from `source`.
    pub fn new(product: ProductConfig, source: impl TileSource + 'static) -> Self {
        Self::with_reactor(product, source, Rc::new(Reactor::new()))
    }

    /// Create a service whose source submits work to `reactor`.
    pub fn with_reactor(
        product: ProductConfig,
        source: impl TileSource + 'static,
        reactor: Rc<Reactor>,
    ) -> Self {
        Self {
            product,
            source: Box::new(source),
            reactor,
        }
    }

    /// Create a builder reading tiles from `data_dir`.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> DemServiceBuilder {
        DemServiceBuilder::new(data_dir)
    }

    pub fn product(&self) -> &ProductConfig {
        &self.product
    }

    pub fn reactor(&self) -> &Rc<Reactor> {
        &self.reactor
    }

    /// Resolve the tiles a query needs without loading them.
    pub fn plan(&self, query: &CoordsQuery) -> Result<TilePlan> {
        let coords = query.validate()?;
        Ok(plan_tiles(&coords, &self.product))
    }

    /// Fetch and decode every tile concurrently.
    ///
    /// Fulfills with the grids in `addresses` order once all have loaded, or
    /// rejects with the first failure observed.
    pub fn load(&self, addresses: &[String]) -> Promise<Vec<ElevationGrid>, DemError> {
        let byte_order = self.product.byte_order;
        let tiles: Vec<Promise<ElevationGrid, DemError>> = addresses
            .iter()
            .map(|address| {
                debug!(%address, "Requesting tile");
                let address_for_decode = address.clone();
                self.source.fetch(address).then(move |bytes| {
                    decode_tile(&address_for_decode, &bytes, byte_order)
                        .map(|tile| tile.grid)
                        .into()
                })
            })
            .collect();
        all(tiles)
    }

    /// Build the elevation grid for `query`.
    ///
    /// The query is validated before any tile is requested.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidCoordinates`] synchronously if the query
    /// holds neither a point nor a complete bounding box, or if its values are
    /// out of range. Failures after that reject the returned promise.
    pub fn get_dem(
        &self,
        query: &CoordsQuery,
        policy: ResamplePolicy,
    ) -> Result<Promise<ElevationGrid, DemError>> {
        let plan = self.plan(query)?;
        let tiles = self.load(&plan.addresses);

        let context = Rc::new(PipelineContext { plan, policy });
        Ok(tiles.then(move |grids| context.assemble(grids).into()))
    }

    /// Build the elevation grid for `query`, driving the reactor until it is ready.
    ///
    /// # Errors
    ///
    /// Any error of [`get_dem`](Self::get_dem) or of the pipeline, and
    /// [`DemError::PipelineStalled`] if the result can never arrive.
    pub fn get_dem_blocking(
        &self,
        query: &CoordsQuery,
        policy: ResamplePolicy,
    ) -> Result<ElevationGrid> {
        let promise = self.get_dem(query, policy)?;
        self.reactor
            .run_until_settled(&promise)
            .ok_or(DemError::PipelineStalled)?
            .into_result()
    }
}

/// Builder for creating [`DemService`] instances.
///
/// The builder is `Clone + Send + Sync`. Clones share one [`TileCache`], so a
/// multi-threaded server can keep a single builder and call
/// [`build`](Self::build) per request.
///
/// # Example
///
/// ```no_run
/// use demgrid::{DemServiceBuilder, ProductConfig};
///
/// let service = DemServiceBuilder::new("/data/usgs")
///     .product(ProductConfig::bil())
///     .cache_size(50)
///     .build()?;
/// # Ok::<(), demgrid::DemError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DemServiceBuilder {
    data_dir: PathBuf,
    product: ProductConfig,
    cache: Option<TileCache>,
    #[cfg(feature = "download")]
    download_config: Option<DownloadConfig>,
}

impl DemServiceBuilder {
    /// Create a new builder with the specified data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            product: ProductConfig::hgt(),
            cache: Some(TileCache::new(DEFAULT_CACHE_SIZE)),
            #[cfg(feature = "download")]
            download_config: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DEM_DATA_DIR` | Directory containing tile files | Required |
    /// | `DEM_CACHE_SIZE` | Maximum tiles in cache, 0 disables caching | 100 |
    /// | `DEM_DOWNLOAD_URL` | Base URL for missing tiles* | None |
    ///
    /// *Only used when `download` feature is enabled.
    ///
    /// The product is read with [`ProductConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidConfig`] if `DEM_DATA_DIR` is not set or a
    /// variable holds an unparsable value.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("DEM_DATA_DIR").map_err(|_| DemError::InvalidConfig {
            reason: "DEM_DATA_DIR environment variable not set".to_string(),
        })?;

        let cache_size = match std::env::var("DEM_CACHE_SIZE") {
            Ok(value) => value.trim().parse().map_err(|_| DemError::InvalidConfig {
                reason: format!("DEM_CACHE_SIZE must be a number, got '{}'", value),
            })?,
            Err(_) => DEFAULT_CACHE_SIZE,
        };

        #[allow(unused_mut)]
        let mut builder = Self::new(data_dir)
            .product(ProductConfig::from_env()?)
            .cache_size(cache_size);

        #[cfg(feature = "download")]
        if let Ok(url) = std::env::var("DEM_DOWNLOAD_URL") {
            builder = builder.auto_download(DownloadConfig::new(url));
        }

        Ok(builder)
    }

    /// Set the data directory.
    ///
    /// Overrides the directory set in the constructor or from environment.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn product(mut self, product: ProductConfig) -> Self {
        self.product = product;
        self
    }

    /// Set the maximum number of tiles to keep in cache.
    ///
    /// Replaces any shared cache with a new one. Zero disables caching.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache = (size > 0).then(|| TileCache::new(size));
        self
    }

    /// Share an existing cache.
    pub fn tile_cache(mut self, cache: TileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enable auto-download of tiles missing from the data directory.
    #[cfg(feature = "download")]
    pub fn auto_download(mut self, config: DownloadConfig) -> Self {
        self.download_config = Some(config);
        self
    }

    pub fn data_dir_path(&self) -> &Path {
        &self.data_dir
    }

    pub fn product_config(&self) -> &ProductConfig {
        &self.product
    }

    /// Statistics of the shared cache, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(TileCache::stats)
    }

    /// Build a [`DemService`].
    ///
    /// # Errors
    ///
    /// Returns an error if auto-download is enabled but the HTTP client
    /// cannot be created.
    pub fn build(&self) -> Result<DemService> {
        let reactor = Rc::new(Reactor::new());

        #[cfg(feature = "download")]
        if let Some(config) = &self.download_config {
            let source = HttpSource::new(config.clone(), Rc::clone(&reactor))?
                .with_data_dir(&self.data_dir);
            return Ok(self.assemble(source, reactor));
        }

        let source = DirectorySource::new(&self.data_dir);
        Ok(self.assemble(source, reactor))
    }

    fn assemble<S: TileSource + 'static>(&self, source: S, reactor: Rc<Reactor>) -> DemService {
        let product = self.product.clone();
        match &self.cache {
            Some(cache) => {
                DemService::with_reactor(product, CachedSource::new(source, cache.clone()), reactor)
            }
            None => DemService::with_reactor(product, source, reactor),
        }
    }
}
