pub mod client;

pub use client::HttpClient;

use async_trait::async_trait;
use url::Url;

/// Source of page bodies for the crawler.
///
/// `Ok(None)` means "nothing to extract from this node" (timeout, non-2xx).
/// `Err` is a transport failure the caller may retry.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> anyhow::Result<Option<String>>;
}
