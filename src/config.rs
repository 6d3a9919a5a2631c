//! Configuration management for tartiles.
//!
//! This module provides the command-line interface:
//! - Subcommands for serving, one-shot archive fetches and raster checks
//! - Environment variables with `TARTILES_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use tartiles::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Serve(config) = cli.command {
//!     config.validate()?;
//!     println!("Listening on {}", config.bind_address());
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `TARTILES_HOST` - Server bind address (default: 0.0.0.0)
//! - `TARTILES_PORT` - Server port (default: 3000)
//! - `TARTILES_MOUNT` - Route prefix of the archive endpoint (default: /tartiles)
//! - `TARTILES_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `TARTILES_NO_CORS` - Omit the CORS header (default: false)
//! - `TARTILES_INDIRECT` - Serve subrequests only (default: false)
//! - `TARTILES_RASTER` - Raster description file (required)
//! - `TARTILES_SOURCE` - Tile source URL or directory (required)
//! - `TARTILES_SUFFIX` - Suffix appended to tile paths (default: empty)
//! - `TARTILES_MAX_TILES` - Maximum range width and height (default: 4)
//! - `TARTILES_FETCH_TIMEOUT` - Upstream request timeout seconds (default: 30)

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::range::{DEFAULT_MAX_LINEAR_TILES, MAX_LINEAR_TILES_CEILING};
use crate::raster::TiledRaster;
use crate::server::DEFAULT_MOUNT;
use crate::source::{AnySource, FileTileSource, HttpTileSource};
use crate::tile::TarTileService;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Default upstream request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tartiles - Stream a rectangular range of raster tiles as one tar archive.
#[derive(Parser, Debug, Clone)]
#[command(name = "tartiles")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server.
    Serve(ServeConfig),

    /// Build one archive and write it to a file or stdout.
    Fetch(FetchConfig),

    /// Load a raster description and print its levels.
    Check(CheckConfig),
}

/// Tile source and range limit arguments shared by `serve` and `fetch`.
#[derive(Args, Debug, Clone)]
pub struct SourceConfig {
    /// Raster description file (JSON).
    #[arg(long, env = "TARTILES_RASTER")]
    pub raster: PathBuf,

    /// Tile source: an http(s) base URL or a local directory.
    #[arg(long, env = "TARTILES_SOURCE")]
    pub source: String,

    /// Suffix appended to every tile path at the source (e.g. ".jpg").
    #[arg(long, default_value = "", env = "TARTILES_SUFFIX")]
    pub suffix: String,

    /// Maximum width and height of a requested range, in tiles.
    #[arg(long, default_value_t = DEFAULT_MAX_LINEAR_TILES, env = "TARTILES_MAX_TILES")]
    pub max_tiles: u32,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT, env = "TARTILES_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,
}

impl SourceConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tiles == 0 || self.max_tiles > MAX_LINEAR_TILES_CEILING {
            return Err(format!(
                "max_tiles must be between 1 and {}",
                MAX_LINEAR_TILES_CEILING
            ));
        }

        if self.fetch_timeout == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }

        if self.source.is_empty() {
            return Err("Tile source is required. Set --source or TARTILES_SOURCE".to_string());
        }

        Ok(())
    }

    /// Whether the source is an HTTP tile service.
    pub fn is_http(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }

    /// Build the configured tile source.
    pub fn build_source(&self) -> Result<AnySource, String> {
        if self.is_http() {
            let base = Url::parse(&self.source)
                .map_err(|e| format!("Invalid source URL '{}': {}", self.source, e))?;
            let timeout = Duration::from_secs(self.fetch_timeout);
            let source = HttpTileSource::new(base, self.suffix.clone(), timeout)
                .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
            return Ok(AnySource::Http(source));
        }

        let root = Path::new(&self.source);
        if !root.is_dir() {
            return Err(format!(
                "Tile source directory '{}' does not exist",
                root.display()
            ));
        }
        Ok(AnySource::File(FileTileSource::new(
            root,
            self.suffix.clone(),
        )))
    }

    /// Load the raster and source and assemble the service.
    pub fn build_service(&self) -> Result<TarTileService<AnySource>, String> {
        let raster = load_raster(&self.raster)?;
        let source = self.build_source()?;
        Ok(TarTileService::new(source, raster).with_max_linear_tiles(self.max_tiles))
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TARTILES_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TARTILES_PORT")]
    pub port: u16,

    /// Route prefix owned by the archive endpoint.
    #[arg(long, default_value = DEFAULT_MOUNT, env = "TARTILES_MOUNT")]
    pub mount: String,

    // =========================================================================
    // Response Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "TARTILES_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Do not emit `Access-Control-Allow-Origin: *`.
    #[arg(long, default_value_t = false, env = "TARTILES_NO_CORS")]
    pub no_cors: bool,

    /// Serve only in-process subrequests, decline top-level requests.
    #[arg(long, default_value_t = false, env = "TARTILES_INDIRECT")]
    pub indirect: bool,

    // =========================================================================
    // Source Configuration
    // =========================================================================
    #[command(flatten)]
    pub source: SourceConfig,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.mount.starts_with('/') {
            return Err(format!("mount '{}' must start with '/'", self.mount));
        }
        if self.mount.contains('{') || self.mount.contains('}') {
            return Err(format!("mount '{}' must not contain braces", self.mount));
        }

        self.source.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the `fetch` command.
#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Range path, e.g. `/3/10/20/2/2`.
    pub path: String,

    /// Write the archive to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceConfig,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Configuration for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Raster description file (JSON).
    #[arg(long, env = "TARTILES_RASTER")]
    pub raster: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Load a raster description, formatting failures for the command line.
pub fn load_raster(path: &Path) -> Result<TiledRaster, String> {
    TiledRaster::load(path).map_err(|e| format!("Failed to load raster: {}", e))
}

// =============================================================================
// Tests
// =============================================================================
