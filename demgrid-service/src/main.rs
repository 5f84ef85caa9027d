//! demgrid-service - HTTP microservice for DEM elevation mosaics.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DEM_DATA_DIR` | Directory containing tile files | current directory |
//! | `DEM_PRODUCT` | Product preset: "hgt" or "bil" | hgt |
//! | `DEM_FOLDER`, `DEM_TEMPLATE`, `DEM_EXTENSION` | Tile naming overrides | preset |
//! | `DEM_BYTE_ORDER`, `DEM_UPPERCASE`, `DEM_OVERLAP` | Tile format overrides | preset |
//! | `DEM_CACHE_SIZE` | Maximum tiles in cache | 100 |
//! | `DEM_DOWNLOAD_URL` | Base URL for missing tiles | None |
//! | `DEM_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /dem` - Elevation grid for a point or bounding box
//! - `GET /tiles` - Tiles a query would load
//! - `GET /health` - Health check
//! - `GET /stats` - Cache statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use demgrid::{DemError, DemServiceBuilder, ProductConfig};
use demgrid_service::{router, AppState};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demgrid_service=info,demgrid=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("DEM_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let builder = match DemServiceBuilder::from_env() {
        Ok(builder) => builder,
        Err(DemError::InvalidConfig { reason }) if std::env::var("DEM_DATA_DIR").is_err() => {
            tracing::warn!(%reason, "Using current directory");
            DemServiceBuilder::new(".").product(ProductConfig::from_env()?)
        }
        Err(e) => return Err(e.into()),
    };

    // Fail at startup rather than on the first request.
    builder.build()?;

    tracing::info!(
        data_dir = %builder.data_dir_path().display(),
        extension = %builder.product_config().extension,
        byte_order = %builder.product_config().byte_order,
        caching = builder.cache_stats().is_some(),
        port = port,
        "Starting demgrid service"
    );

    let state = Arc::new(AppState { builder });

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
