//! Router configuration for tartiles.
//!
//! # Route Structure
//!
//! ```text
//! /health                                        - Health check
//! {mount}/{level}/{row}/{col}/{width}/{height}   - Tile archive endpoint
//! {mount}/{extra}/{level}/{row}/{col}/{w}/{h}    - With an extra dimension
//! ```
//!
//! Requests outside the mount are not owned by this router and fall through
//! to its fallback (404). Methods other than GET and HEAD on the mount are
//! declined the same way instead of answering 405.
//!
//! # Example
//!
//! ```ignore
//! use tartiles::server::{create_router, RouterConfig};
//! use tartiles::tile::TarTileService;
//!
//! let service = TarTileService::new(source, raster);
//! let config = RouterConfig::new("/tartiles").with_cache_max_age(600);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{decline_handler, health_handler, tar_handler, AppState};
use crate::source::TileSource;
use crate::tile::TarTileService;

/// Default route prefix owned by the tile archive handler.
pub const DEFAULT_MOUNT: &str = "/tartiles";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Route prefix owned by the archive handler
    pub mount: String,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Emit `Access-Control-Allow-Origin: *` on archives
    pub cors: bool,

    /// Only serve in-process subrequests
    pub indirect: bool,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT)
    }
}

impl RouterConfig {
    /// Create a router configuration for the given mount prefix.
    ///
    /// By default:
    /// - CORS header is emitted
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Top-level requests are served
    /// - Tracing is enabled
    pub fn new(mount: impl Into<String>) -> Self {
        Self {
            mount: mount.into(),
            cache_max_age: 3600,
            cors: true,
            indirect: false,
            enable_tracing: true,
        }
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable the CORS header.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Serve only requests carrying the `Subrequest` extension.
    pub fn with_indirect(mut self, enabled: bool) -> Self {
        self.indirect = enabled;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Route pattern of the archive endpoint.
    pub fn route_pattern(&self) -> String {
        format!("{}/{{*range}}", self.mount.trim_end_matches('/'))
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The service building archives for range requests
/// * `config` - Router configuration
pub fn create_router<S>(service: TarTileService<S>, config: RouterConfig) -> Router
where
    S: TileSource + 'static,
{
    let mut app_state = AppState::new(service);
    app_state.cache_max_age = config.cache_max_age;
    app_state.cors = config.cors;
    app_state.indirect = config.indirect;

    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            &config.route_pattern(),
            get(tar_handler::<S>).fallback(decline_handler),
        )
        .with_state(app_state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================
