//! HTTP server layer for tartiles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     GET {mount}/{level}/{row}/{col}/{width}/{height}            │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (ownership, streaming)   │  │  (mount, tracing, state)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    decline_handler, health_handler, tar_handler, AppState, ErrorResponse, HealthResponse,
    Subrequest, TAR_CONTENT_TYPE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MOUNT};
