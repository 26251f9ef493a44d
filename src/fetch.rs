// src/fetch.rs

use reqwest::Client;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

use crate::config::SourceLocation;
use crate::error::{BoxError, PipelineError, Result};

/// Load the raw CSV bytes from `source`. Any failure here is fatal and
/// happens before a single output byte is written.
#[tracing::instrument(level = "info", skip_all, fields(source = %source))]
pub async fn fetch_source(client: &Client, source: &SourceLocation) -> Result<Vec<u8>> {
    let unavailable = |e: BoxError| {
        PipelineError::SourceUnavailable {
            location: source.to_string(),
            source: e,
        }
    };

    let bytes = match source {
        SourceLocation::Url(raw) => {
            let url = Url::parse(raw).map_err(|e| unavailable(e.into()))?;
            download(client, &url).await.map_err(|e| unavailable(e.into()))?
        }
        SourceLocation::File(path) => fs::read(path).await.map_err(|e| unavailable(e.into()))?,
    };

    info!(bytes = bytes.len(), "source loaded");
    Ok(bytes)
}

async fn download(client: &Client, url: &Url) -> reqwest::Result<Vec<u8>> {
    let resp = client.get(url.as_str()).send().await?.error_for_status()?;
    debug!(status = %resp.status(), len = ?resp.content_length(), "response");
    let bytes = resp.bytes().await?;
    Ok(bytes.to_vec())
}
