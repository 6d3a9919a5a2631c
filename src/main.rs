//! tartiles - Stream a rectangular range of raster tiles as one tar archive.
//!
//! This binary starts the HTTP server, or runs one-shot commands against the
//! same configuration.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tartiles::{
    config::{load_raster, CheckConfig, Cli, Command, FetchConfig, ServeConfig},
    error::TarTilesError,
    server::{create_router, RouterConfig},
    source::TileSource,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Fetch(config) => run_fetch(config).await,
        Command::Check(config) => run_check(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = match config.source.build_service() {
        Ok(service) => service,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let raster = service.raster();
    info!("tartiles v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Source: {}", service.source().identifier());
    info!(
        "  Raster: {}x{} px, {}x{} px tiles, {} level(s)",
        raster.size().x,
        raster.size().y,
        raster.page_size().x,
        raster.page_size().y,
        raster.level_count()
    );
    info!("  Max range: {0}x{0} tiles", service.max_linear_tiles());
    info!("  Mount: {}", config.mount);
    if config.indirect {
        warn!("  Indirect mode: top-level requests are declined");
    }

    let router_config = build_router_config(&config);
    let router = create_router(service, router_config);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!(
        "  Try: curl -o range.tar http://{}{}/0/0/0/1/1",
        addr,
        config.mount.trim_end_matches('/')
    );

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tartiles=debug,tower_http=debug"
    } else {
        "tartiles=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    RouterConfig::new(config.mount.clone())
        .with_cache_max_age(config.cache_max_age)
        .with_cors(!config.no_cors)
        .with_indirect(config.indirect)
        .with_tracing(!config.no_tracing)
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.source.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let service = match config.source.build_service() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Nothing is created on disk until the range is known to hold a tile.
    let mut aggregator = match service.open_archive(&config.path).await {
        Ok(aggregator) => aggregator,
        Err(TarTilesError::NoContent) => {
            eprintln!("No tiles found in range '{}'", config.path);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match config.output {
        Some(ref path) => {
            let mut file = match tokio::fs::File::create(path).await {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("Error: cannot create '{}': {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            match aggregator.write_to(&mut file).await {
                Ok(bytes) => file.sync_all().await.map(|_| bytes),
                Err(e) => Err(e),
            }
        }
        None => {
            let mut stdout = tokio::io::stdout();
            aggregator.write_to(&mut stdout).await
        }
    };

    match result {
        Ok(bytes) => {
            eprintln!("Wrote {} bytes", bytes);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("tartiles Raster Check");
    println!("═════════════════════");
    println!();

    let raster = match load_raster(&config.raster) {
        Ok(raster) => {
            println!("✓ Raster: {}", config.raster.display());
            raster
        }
        Err(e) => {
            println!("✗ Raster: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let size = raster.size();
    let page = raster.page_size();
    println!("  Size: {} x {} px", size.x, size.y);
    if raster.has_extra_dimension() {
        println!("  Extra dimension: {} (extra index required in paths)", size.z);
    }
    println!("  Tile size: {} x {} px", page.x, page.y);
    println!("  Max tile bytes: {}", raster.max_tile_size());
    println!();

    println!("Levels:");
    println!("─────────────────────────────────");
    println!("  {:>5}  {:>6}  {:>12}  {:>12}", "level", "source", "columns", "rows");
    for level in 0..raster.level_count() {
        if let Some(bounds) = raster.level_bounds(level) {
            println!(
                "  {:>5}  {:>6}  {:>12}  {:>12}",
                level,
                raster.source_level(level),
                bounds.grid_width,
                bounds.grid_height
            );
        }
    }

    println!();
    println!("═════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
