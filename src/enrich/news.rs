//! News headline lookup.
//!
//! One trait seam so the dispatcher can run against the real GNews API or
//! an in-memory stub. The client asks for a single article: anomalies
//! only carry the most relevant headline, not a digest.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

const GNEWS_SEARCH_URL: &str = "https://gnews.io/api/v4/search";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Headline search boundary.
///
/// `Ok(None)` means the search ran but matched nothing; errors cover
/// transport and API failures. The dispatcher substitutes placeholder
/// text either way, so implementations never invent content.
#[async_trait]
pub trait NewsLookup: Send + Sync {
    async fn top_headline(
        &self,
        query: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
}

/// GNews search response, reduced to the fields consumed here.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: String,
}

/// GNews API client.
pub struct GnewsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GnewsClient {
    pub fn new(api_key: String) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_base_url(api_key, GNEWS_SEARCH_URL.to_string())
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(
        api_key: String,
        base_url: String,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl NewsLookup for GnewsClient {
    async fn top_headline(
        &self,
        query: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("lang", "en"),
                ("max", "1"),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("news API returned {}", response.status()).into());
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.articles.into_iter().next().map(|article| article.title))
    }
}
