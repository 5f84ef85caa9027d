//! HTTP request handlers for the elevation service.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use demgrid::{plan_tiles, CoordsQuery, DemError, ResamplePolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Query parameters shared by `/dem` and `/tiles`.
///
/// Give either `lat` and `lon`, or all four of `top_lat`, `bot_lat`,
/// `left_lon` and `right_lon`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DemQuery {
    /// Latitude of a point; the whole enclosing tile is returned.
    pub lat: Option<f64>,
    /// Longitude of a point.
    pub lon: Option<f64>,
    /// Northern edge of the bounding box.
    pub top_lat: Option<f64>,
    /// Southern edge of the bounding box.
    pub bot_lat: Option<f64>,
    /// Western edge of the bounding box.
    pub left_lon: Option<f64>,
    /// Eastern edge of the bounding box.
    pub right_lon: Option<f64>,
    /// Round each axis' segment count up to a multiple of this value.
    pub multiple_of: Option<usize>,
    /// Exact output lines (with `columns`).
    pub lines: Option<usize>,
    /// Exact output columns (with `lines`).
    pub columns: Option<usize>,
}

impl DemQuery {
    pub fn coords(&self) -> CoordsQuery {
        CoordsQuery {
            lat: self.lat,
            lon: self.lon,
            top_lat: self.top_lat,
            bot_lat: self.bot_lat,
            left_lon: self.left_lon,
            right_lon: self.right_lon,
        }
    }

    pub fn policy(&self) -> Result<ResamplePolicy, DemError> {
        ResamplePolicy::from_parts(self.multiple_of, self.lines, self.columns)
    }
}

/// Elevation grid in row-major order, north to south and west to east.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DemResponse {
    pub grid: Vec<i16>,
    pub lines: usize,
    pub columns: usize,
}

/// Tiles a query needs, in assembly order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TilesResponse {
    pub addresses: Vec<String>,
    /// Tiles per row.
    pub h_squares: usize,
    /// Tile rows.
    pub v_squares: usize,
    pub limits: LimitsResponse,
    /// Adjacent tiles share a boundary row and column.
    pub overlap: bool,
}

/// Whole-degree extent of the mosaic.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LimitsResponse {
    pub min_lat: i32,
    pub max_lat: i32,
    pub min_lon: i32,
    pub max_lon: i32,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Cache statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of tiles in cache.
    pub cached_tiles: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Assemble the elevation grid for a point or bounding box.
///
/// The pipeline runs on a blocking thread with its own single-threaded
/// service; tile bytes are shared through the builder's cache.
#[utoipa::path(
    get,
    path = "/dem",
    tag = "dem",
    params(DemQuery),
    responses(
        (status = 200, description = "Elevation grid", body = DemResponse),
        (status = 400, description = "Invalid coordinates or resampling options", body = ErrorResponse),
        (status = 404, description = "A required tile is unavailable", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    )
)]
pub async fn get_dem(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DemQuery>,
) -> Response {
    tracing::debug!(?query, "DEM query");

    let builder = state.builder.clone();
    let coords = query.coords();
    let joined = tokio::task::spawn_blocking(move || {
        let policy = query.policy()?;
        let service = builder.build()?;
        service.get_dem_blocking(&coords, policy)
    })
    .await;

    match joined {
        Ok(Ok(grid)) => {
            tracing::info!(lines = grid.lines, columns = grid.columns, "Grid assembled");
            (
                StatusCode::OK,
                Json(DemResponse {
                    lines: grid.lines,
                    columns: grid.columns,
                    grid: grid.samples,
                }),
            )
                .into_response()
        }
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            tracing::error!(error = %e, "DEM task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "pipeline task failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// List the tiles a query would load, without reading them.
#[utoipa::path(
    get,
    path = "/tiles",
    tag = "dem",
    params(DemQuery),
    responses(
        (status = 200, description = "Tile plan", body = TilesResponse),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn get_tiles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DemQuery>,
) -> Response {
    let coords = match query.coords().validate() {
        Ok(coords) => coords,
        Err(e) => return error_response(e),
    };
    let plan = plan_tiles(&coords, state.builder.product_config());

    Json(TilesResponse {
        h_squares: plan.h_squares,
        v_squares: plan.v_squares,
        limits: LimitsResponse {
            min_lat: plan.limits.min_lat,
            max_lat: plan.limits.max_lat,
            min_lon: plan.limits.min_lon,
            max_lon: plan.limits.max_lon,
        },
        overlap: plan.overlap,
        addresses: plan.addresses,
    })
    .into_response()
}

fn status_for(e: &DemError) -> StatusCode {
    match e {
        DemError::InvalidCoordinates { .. } | DemError::InvalidResamplePolicy { .. } => {
            StatusCode::BAD_REQUEST
        }
        DemError::TileFetchFailed { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: DemError) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!(error = %e, "DEM query failed");
    } else {
        tracing::warn!(error = %e, "DEM query failed");
    }

    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Tile cache statistics. All zero when caching is disabled.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "system",
    responses((status = 200, description = "Cache statistics", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.builder.cache_stats().unwrap_or_default();

    Json(StatsResponse {
        cached_tiles: stats.entry_count,
        cache_hits: stats.hit_count,
        cache_misses: stats.miss_count,
        hit_rate: stats.hit_rate(),
    })
}
