use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use rand::prelude::IndexedRandom;
use reqwest::{redirect, Client, ClientBuilder};
use tokio::time::timeout;
use url::Url;

use super::PageFetcher;

const MAX_REDIRECTS: usize = 10;

pub struct HttpClient {
    inner: Client,
    user_agents: Vec<&'static str>,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Self::from_builder(ClientBuilder::new(), timeout)
    }

    /// Client that ignores proxy settings from the environment.
    #[cfg(test)]
    fn direct(timeout: Duration) -> anyhow::Result<Self> {
        Self::from_builder(ClientBuilder::new().no_proxy(), timeout)
    }

    fn from_builder(builder: ClientBuilder, timeout: Duration) -> anyhow::Result<Self> {
        let inner = builder
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(true)
            .build()
            .context("failed to build HTTP client")?;

        // Randomized User-Agent pool for fingerprint evasion
        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) \
             Gecko/20100101 Firefox/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_0) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ];

        Ok(Self {
            inner,
            user_agents,
            timeout,
        })
    }

    /// One GET raced against the configured timeout.
    ///
    /// The request future is dropped when the timer wins, so a late response
    /// is never awaited. Non-2xx statuses yield `Ok(None)`.
    pub async fn fetch_page(&self, url: &Url) -> anyhow::Result<Option<String>> {
        debug!("Fetching URL: {}", url);

        let request = async {
            let response = self
                .inner
                .get(url.as_str())
                .header(reqwest::header::USER_AGENT, self.get_random_user_agent())
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                debug!("{} answered HTTP {}", url, status);
                return Ok(None);
            }

            response.text().await.map(Some)
        };

        match timeout(self.timeout, request).await {
            Ok(result) => result.with_context(|| format!("GET {} failed", url)),
            Err(_) => {
                debug!("Timed out after {:?}: {}", self.timeout, url);
                Ok(None)
            }
        }
    }

    fn get_random_user_agent(&self) -> &'static str {
        let mut rng = rand::rng();
        *self.user_agents.choose(&mut rng).unwrap_or(&"Mozilla/5.0")
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &Url) -> anyhow::Result<Option<String>> {
        self.fetch_page(url).await
    }
}
