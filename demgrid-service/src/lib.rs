//! demgrid service library
//!
//! HTTP handlers, router and OpenAPI document for the elevation mosaic
//! service. Used by both the `demgrid-service` binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use demgrid::DemServiceBuilder;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
///
/// A [`demgrid::DemService`] is single-threaded, so handlers build one per
/// request from this builder. Builds share the builder's tile cache.
#[derive(Debug, Clone)]
pub struct AppState {
    pub builder: DemServiceBuilder,
}

/// OpenAPI documentation for the service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "demgrid Elevation Service",
        version = "0.1.0",
        description = "REST API assembling elevation grids from one-degree DEM tiles.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_dem,
        handlers::get_tiles,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::DemResponse,
            handlers::TilesResponse,
            handlers::LimitsResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "dem", description = "Elevation grid endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router, including Swagger UI at `/docs`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/dem", get(handlers::get_dem))
        .route("/tiles", get(handlers::get_tiles))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}

pub use handlers::{
    DemQuery, DemResponse, ErrorResponse, HealthResponse, StatsResponse, TilesResponse,
};
