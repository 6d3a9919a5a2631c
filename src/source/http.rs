use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{redirect, Client, StatusCode};
use tracing::trace;
use url::Url;

use super::{FetchStatus, TileAddress, TileSource};
use crate::error::SourceError;

/// Tile source backed by an HTTP tile service.
///
/// Tiles are requested from `{base}/{tile path}{suffix}`. Redirects are not
/// followed by the client: a 3xx answer is reported as
/// [`FetchStatus::Redirect`] so the caller decides whether to chase it.
#[derive(Clone)]
pub struct HttpTileSource {
    client: Client,
    base: Url,
    suffix: String,
    identifier: String,
}

impl HttpTileSource {
    /// Create a source for the given base URL.
    pub fn new(
        base: Url,
        suffix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, base, suffix))
    }

    /// Create a source using an existing client.
    ///
    /// The client should not follow redirects.
    pub fn with_client(client: Client, mut base: Url, suffix: impl Into<String>) -> Self {
        // Url::join replaces the last segment unless the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let identifier = base.to_string();
        Self {
            client,
            base,
            suffix: suffix.into(),
            identifier,
        }
    }

    /// URL of a tile.
    pub fn tile_url(&self, tile: &TileAddress) -> Result<Url, SourceError> {
        self.base
            .join(&tile.path(&self.suffix))
            .map_err(|e| SourceError::InvalidPath(e.to_string()))
    }

    async fn get(
        &self,
        url: Url,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        trace!(url = %url, "fetching tile");
        let mut response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(http::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Ok(FetchStatus::Redirect { location });
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(FetchStatus::NotFound);
        }
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > capacity as u64 {
                return Err(SourceError::TooLarge { capacity });
            }
        }

        let start = buf.len();
        while let Some(chunk) = response.chunk().await? {
            if buf.len() - start + chunk.len() > capacity {
                buf.truncate(start);
                return Err(SourceError::TooLarge { capacity });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(FetchStatus::Ok)
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(
        &self,
        tile: &TileAddress,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        let url = self.tile_url(tile)?;
        self.get(url, buf, capacity).await
    }

    async fn fetch_local(
        &self,
        path: &str,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        if !path.starts_with('/') {
            return Err(SourceError::InvalidPath(path.to_string()));
        }
        let url = self
            .base
            .join(path)
            .map_err(|e| SourceError::InvalidPath(e.to_string()))?;
        self.get(url, buf, capacity).await
    }

    fn origin(&self) -> Option<&Url> {
        Some(&self.base)
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
