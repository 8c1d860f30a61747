//! Loading the raw declarations source from disk or over HTTP.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::debug;

/// Issues a GET for `url` and returns the body, failing on a non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned {status}");
    }

    Ok(resp.bytes().await?)
}

/// Reads `source` from the local filesystem, or downloads it when it looks like a URL.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_source(source: &str) -> Result<Bytes> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let client = BasicClient::new();
        fetch_bytes(&client, source)
            .await
            .with_context(|| format!("failed to download {source}"))?
    } else {
        let data = tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read {source}"))?;
        Bytes::from(data)
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}
