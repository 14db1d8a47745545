pub mod html;
pub mod types;
pub mod urls;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::retry::RetryPolicy;
use html::PageLimits;
use types::ScrapeResult;

/// Desktop browser identification sent with every page fetch.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Raw HTTP response as seen by the scraper.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// HTTP GET capability. Transport errors are `Err`; any status is `Ok`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedPage>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<FetchedPage> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;
        let status = resp.status().as_u16();
        let body = resp.text().await.context("Failed to read response body")?;
        Ok(FetchedPage { status, body })
    }
}

pub struct WebScraper {
    fetcher: Arc<dyn PageFetcher>,
    retry: RetryPolicy,
    limits: PageLimits,
}

impl WebScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, retry: RetryPolicy, limits: PageLimits) -> Self {
        Self {
            fetcher,
            retry,
            limits,
        }
    }

    /// Fetch and simplify one page, retrying any failure with backoff.
    /// The error carries the last attempt's message.
    pub async fn scrape(&self, url: &str) -> Result<ScrapeResult> {
        let result = self
            .retry
            .run(
                url,
                |attempt| async move {
                    debug!(url, attempt = attempt + 1, "Scraping page");
                    self.scrape_once(url)
                        .await
                        .with_context(|| format!("Scraping attempt {} failed", attempt + 1))
                },
                |_| true,
            )
            .await?;

        info!(
            url,
            title = %result.page_title,
            text_len = result.body_text.len(),
            tables = result.tables.len(),
            "Page scraped"
        );
        Ok(result)
    }

    async fn scrape_once(&self, url: &str) -> Result<ScrapeResult> {
        let page = self.fetcher.get(url).await?;
        if !(200..300).contains(&page.status) {
            anyhow::bail!("HTTP {} for {}", page.status, url);
        }
        Ok(html::parse_page(url, &page.body, self.limits))
    }
}
