//! Tile source tests.
//!
//! The HTTP source runs against a local axum server bound to an ephemeral
//! port; the filesystem source against a temporary directory.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use bytes::BytesMut;
use http_body_util::BodyExt;
use tower::ServiceExt;
use url::Url;

use tartiles::error::SourceError;
use tartiles::source::{FetchStatus, FileTileSource, HttpTileSource, TileSource};
use tartiles::tile::TarTileService;

use super::test_utils::{address, get as get_request, read_entries, test_raster, test_router};

// =============================================================================
// Upstream Server
// =============================================================================

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/tiles/4/1/2.jpg", get(|| async { "tile-1-2" }))
        .route(
            "/tiles/4/1/3.jpg",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/cache/4-1-3")]) }),
        )
        .route(
            "/tiles/4/2/2.jpg",
            get(|| async {
                (
                    StatusCode::MOVED_PERMANENTLY,
                    [(header::LOCATION, "http://elsewhere.invalid/cache/4-2-2")],
                )
            }),
        )
        .route(
            "/tiles/4/2/3.jpg",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/tiles/4/3/3.jpg", get(|| async { vec![0u8; 8192] }))
        .route("/tiles/4/3/4.jpg", get(|| async { StatusCode::GONE }))
        .route("/cache/4-1-3", get(|| async { "cached-1-3" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn http_source(addr: SocketAddr) -> HttpTileSource {
    let base = Url::parse(&format!("http://{}/tiles", addr)).unwrap();
    HttpTileSource::new(base, ".jpg", Duration::from_secs(5)).unwrap()
}

// =============================================================================
// HTTP Source
// =============================================================================

#[tokio::test]
async fn test_http_fetch_statuses() {
    let addr = spawn_upstream().await;
    let source = http_source(addr);
    let mut buf = BytesMut::new();

    let status = source.fetch(&address(4, 1, 2), &mut buf, 1024).await.unwrap();
    assert_eq!(status, FetchStatus::Ok);
    assert_eq!(&buf[..], b"tile-1-2");

    buf.clear();
    let status = source.fetch(&address(4, 1, 3), &mut buf, 1024).await.unwrap();
    assert_eq!(
        status,
        FetchStatus::Redirect {
            location: Some("/cache/4-1-3".to_string())
        }
    );
    assert!(buf.is_empty());

    let status = source.fetch(&address(4, 9, 9), &mut buf, 1024).await.unwrap();
    assert_eq!(status, FetchStatus::NotFound);

    let status = source.fetch(&address(4, 3, 4), &mut buf, 1024).await.unwrap();
    assert_eq!(status, FetchStatus::NotFound);

    let err = source.fetch(&address(4, 2, 3), &mut buf, 1024).await.unwrap_err();
    assert!(matches!(err, SourceError::Status(500)));
}

#[tokio::test]
async fn test_http_fetch_respects_capacity() {
    let addr = spawn_upstream().await;
    let source = http_source(addr);
    let mut buf = BytesMut::new();

    let err = source.fetch(&address(4, 3, 3), &mut buf, 4096).await.unwrap_err();
    assert!(matches!(err, SourceError::TooLarge { capacity: 4096 }));
    assert!(buf.is_empty());

    let status = source.fetch(&address(4, 3, 3), &mut buf, 8192).await.unwrap();
    assert_eq!(status, FetchStatus::Ok);
    assert_eq!(buf.len(), 8192);
}

#[tokio::test]
async fn test_http_fetch_local() {
    let addr = spawn_upstream().await;
    let source = http_source(addr);
    let mut buf = BytesMut::new();

    let status = source
        .fetch_local("/cache/4-1-3", &mut buf, 1024)
        .await
        .unwrap();
    assert_eq!(status, FetchStatus::Ok);
    assert_eq!(&buf[..], b"cached-1-3");

    let err = source
        .fetch_local("cache/4-1-3", &mut buf, 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidPath(_)));
}

#[tokio::test]
async fn test_http_connection_refused_is_an_error() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = http_source(addr);
    let mut buf = BytesMut::new();
    let err = source.fetch(&address(4, 0, 0), &mut buf, 1024).await.unwrap_err();
    assert!(matches!(err, SourceError::Http(_)));
}

#[tokio::test]
async fn test_http_archive_end_to_end() {
    let addr = spawn_upstream().await;
    let service = TarTileService::new(http_source(addr), test_raster());

    // Rows 1..3, columns 2..4: a direct tile, a same-origin redirect, an
    // off-origin redirect, and a server error.
    let mut out = Vec::new();
    service.write_archive("/4/1/2/2/2", &mut out).await.unwrap();

    let entries = read_entries(&out);
    assert_eq!(
        entries,
        vec![
            ("L04/R00000001/C00000002.tile".to_string(), b"tile-1-2".to_vec()),
            ("L04/R00000001/C00000003.tile".to_string(), b"cached-1-3".to_vec()),
        ]
    );
}

// =============================================================================
// Filesystem Source
// =============================================================================

#[tokio::test]
async fn test_file_source_through_router() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("4/6")).unwrap();
    std::fs::write(dir.path().join("4/6/7.png"), b"png-6-7").unwrap();
    std::fs::write(dir.path().join("4/6/8.png"), b"png-6-8").unwrap();
    // Wrong suffix is not a tile.
    std::fs::write(dir.path().join("4/6/9.jpg"), b"jpg-6-9").unwrap();

    let source = FileTileSource::new(dir.path(), ".png");
    let router = test_router(source, test_raster());

    let response = router
        .oneshot(get_request("/tartiles/4/6/7/3/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let names: Vec<String> = read_entries(&body).into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec![
            "L04/R00000006/C00000007.tile".to_string(),
            "L04/R00000006/C00000008.tile".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_file_source_refuses_parent_paths() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileTileSource::new(dir.path().join("tiles"), "");
    std::fs::write(dir.path().join("secret"), b"nope").unwrap();

    let mut buf = BytesMut::new();
    let err = source
        .fetch_local("/../secret", &mut buf, 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidPath(_)));
    assert!(buf.is_empty());
}
