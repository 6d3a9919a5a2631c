//! HTTP request handlers for the tar tiles API.
//!
//! # Endpoints
//!
//! - `GET {mount}/{level}/{row}/{col}/{width}/{height}` - Stream a tile archive
//! - `GET /health` - Health check endpoint
//!
//! Other methods on the mount are declined with a bare 404.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::error::{RangeError, TarTilesError};
use crate::source::TileSource;
use crate::tile::TarTileService;

/// Media type of the archive response.
pub const TAR_CONTENT_TYPE: &str = "application/x-tar";

/// Capacity of the in-memory pipe between the aggregator and the response body.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tar tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: TileSource> {
    /// The service building archives for range requests
    pub service: Arc<TarTileService<S>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether successful archives carry a permissive CORS header
    pub cors: bool,

    /// Only serve requests marked as [`Subrequest`]
    pub indirect: bool,
}

impl<S: TileSource> AppState<S> {
    /// Create a new application state with the given service.
    pub fn new(service: TarTileService<S>) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age: 3600,
            cors: true,
            indirect: false,
        }
    }
}

impl<S: TileSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
            cors: self.cors,
            indirect: self.indirect,
        }
    }
}

/// Request extension marking an in-process subrequest.
///
/// Layers or services that call the router internally insert this into the
/// request extensions. In indirect mode only marked requests are served.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subrequest;

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "range_too_large", "no_content")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TarTilesError to HTTP response.
///
/// Client errors are logged at WARN, except 404 which is an expected outcome
/// for sparse rasters and is logged at DEBUG. Errors carry a JSON body, 404
/// carries none.
impl IntoResponse for TarTilesError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TarTilesError::Range(range_err) => (
                StatusCode::BAD_REQUEST,
                match range_err {
                    RangeError::Malformed { .. } => "malformed_range",
                    RangeError::LevelOutOfRange { .. } => "invalid_level",
                    RangeError::OutOfBounds { .. } => "range_out_of_bounds",
                    RangeError::TooLarge { .. } => "range_too_large",
                },
            ),
            TarTilesError::NoContent => (StatusCode::NOT_FOUND, "no_content"),
            TarTilesError::Aborted(_) => (StatusCode::INTERNAL_SERVER_ERROR, "write_aborted"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "No content: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        // A range without tiles answers with an empty body.
        if matches!(self, TarTilesError::NoContent) {
            return status.into_response();
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile range requests.
///
/// # Endpoint
///
/// `GET {mount}/{level}/{row}/{col}/{width}/{height}`, or with an extra
/// dimension index before the level for rasters that have one.
///
/// # Response
///
/// - `200 OK`: tar stream of every tile found, in row-major order
/// - `400 Bad Request`: malformed, out of bounds, or oversized range
/// - `404 Not Found`: valid range without any tile, or request declined in
///   indirect mode
///
/// # Headers
///
/// - `Content-Type: application/x-tar`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `Access-Control-Allow-Origin: *` (unless disabled)
///
/// The first tile is fetched before the response is committed, so the status
/// reflects whether anything was found. The remaining tiles are streamed from
/// a background task; if the client goes away the task stops at its next
/// write.
pub async fn tar_handler<S: TileSource + 'static>(
    State(state): State<AppState<S>>,
    request: Request,
) -> Result<Response, TarTilesError> {
    if state.indirect && request.extensions().get::<Subrequest>().is_none() {
        debug!(path = request.uri().path(), "declining top-level request");
        return Ok(decline_handler().await);
    }

    let mut aggregator = state.service.open_archive(request.uri().path()).await?;
    drop(request);

    let (mut writer, reader) = tokio::io::duplex(STREAM_BUFFER_SIZE);
    tokio::spawn(async move {
        if let Err(e) = aggregator.write_to(&mut writer).await {
            debug!(
                entries = aggregator.entries(),
                bytes = aggregator.bytes_written(),
                "Archive write aborted: {}",
                e
            );
        }
    });

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(TAR_CONTENT_TYPE),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", state.cache_max_age))
    {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if state.cors {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
    }

    let body = Body::from_stream(ReaderStream::new(reader));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Decline a request this handler does not own.
///
/// Used for non-retrieval methods on the mount and, in indirect mode, for
/// top-level requests. The bare 404 lets an outer service answer instead.
pub async fn decline_handler() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
