//! REST collection path against the discovered product API.

use crate::models::Harvest;
use crate::scrapers::parse;
use crate::scrapers::traits::Collector;
use crate::scrapers::types::CollectorConfig;
use crate::scrapers::{best_items_api_url, review_count_url, reviews_url};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::future;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Thin client over the product API. Every call is a one-shot GET decoded as
/// JSON; failures carry the URL and propagate.
pub struct KurlyClient {
    client: Client,
}

impl KurlyClient {
    /// Build a client sending the header set the site's own frontend uses,
    /// plus the captured authorization token.
    pub fn new(token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("authority", HeaderValue::from_static("api.kurly.com"));
        headers.insert(
            "accept",
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            "accept-language",
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(
            "authorization",
            HeaderValue::from_str(token).context("token is not a valid header value")?,
        );
        headers.insert("origin", HeaderValue::from_static("https://www.kurly.com"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36")
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;
        if !response.status().is_success() {
            bail!("{} returned status {}", url, response.status());
        }
        response
            .json()
            .await
            .with_context(|| format!("response body is not JSON: {url}"))
    }

    /// The curated best-items collection; one page-1 call capped at
    /// `per_page`, no multi-page walking.
    pub async fn best_items(&self, per_page: usize) -> Result<Vec<Value>> {
        let body = self.get_json(&best_items_api_url(per_page)).await?;
        let items = body["data"]
            .as_array()
            .context("best-items payload has no data array")?;
        Ok(items.clone())
    }

    /// Server-reported total review count for one product.
    pub async fn review_count(&self, product_no: u64) -> Result<i64> {
        let body = self.get_json(&review_count_url(product_no)).await?;
        body.pointer("/data/count")
            .and_then(Value::as_i64)
            .context("count payload has no data.count")
    }

    /// Page through a product's reviews until `want` entries are collected
    /// or a short page signals the end, pausing between pages. Requesting
    /// everything in one call invites the API's anti-abuse limiter.
    pub async fn reviews(
        &self,
        product_no: u64,
        want: usize,
        config: &CollectorConfig,
    ) -> Result<Vec<Value>> {
        let mut collected: Vec<Value> = Vec::new();
        let mut page = 1;
        while collected.len() < want {
            let url = reviews_url(
                product_no,
                config.sort.as_param(),
                config.review_page_size,
                page,
            );
            let body = self.get_json(&url).await?;
            let entries = body["data"]
                .as_array()
                .context("review payload has no data array")?;
            let fetched = entries.len();
            collected.extend(entries.iter().cloned());
            if fetched < config.review_page_size {
                break;
            }
            page += 1;
            tokio::time::sleep(config.review_page_backoff).await;
        }
        collected.truncate(want);
        Ok(collected)
    }
}

/// API-based collector: token in, normalized records out.
pub struct KurlyApiScraper {
    client: KurlyClient,
    config: CollectorConfig,
}

impl KurlyApiScraper {
    pub fn new(token: &str, config: CollectorConfig) -> Result<Self> {
        Ok(Self {
            client: KurlyClient::new(token)?,
            config,
        })
    }
}

#[async_trait]
impl Collector for KurlyApiScraper {
    async fn collect(&self) -> Result<Harvest> {
        let config = &self.config;

        let items = self.client.best_items(config.per_page).await?;
        info!("Fetched {} best items", items.len());

        // Every item's count query and review pages are issued together and
        // awaited as one group; the first failure aborts the whole batch.
        let fetches = items.iter().map(|item| async move {
            let no = item["no"]
                .as_u64()
                .context("item payload has no product number")?;
            let count = self.client.review_count(no).await?;
            let want = config
                .review_size
                .unwrap_or_else(|| count.max(0) as usize);
            let entries = self.client.reviews(no, want, config).await?;
            anyhow::Ok((no, count, entries))
        });
        let results = future::try_join_all(fetches).await?;

        let now = parse::now_kst();
        let mut harvest = Harvest::default();
        for (item, (no, count, entries)) in items.iter().zip(&results) {
            harvest.items.push(parse::api_item(item, *no, *count));
            for entry in entries {
                if let Some(record) = parse::api_review(entry, now, config.min_review_age_days)? {
                    harvest.reviews.push(record);
                }
            }
        }

        info!(
            "API pass done: {} items, {} reviews",
            harvest.items.len(),
            harvest.reviews.len()
        );
        Ok(harvest)
    }

    fn source_name(&self) -> &'static str {
        "kurly-api"
    }
}
