use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::similarity::cosine_similarity;

/// Top-level Article Search payload: `{ response: { docs: [...] } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleSearchResponse {
    #[serde(default)]
    pub response: Option<SearchBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub docs: Option<Vec<ArticleDoc>>,
}

/// One archive article; every field may be absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleDoc {
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub headline: Option<Headline>,
    #[serde(default)]
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Headline {
    #[serde(default)]
    pub main: Option<String>,
}

impl ArticleSearchResponse {
    pub fn docs(&self) -> Option<&[ArticleDoc]> {
        self.response
            .as_ref()
            .and_then(|r| r.docs.as_deref())
    }
}

/// Similarity of one archive article to the comment abstract
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleScore {
    pub web_url: Option<String>,
    pub headline: Option<String>,
    pub score: f64,
}

/// Append `api-key=<key>` to a search URL, keeping its existing query
pub fn append_api_key(search_url: &str, api_key: &str) -> Result<String> {
    let mut url = url::Url::parse(search_url)
        .with_context(|| format!("invalid archive search URL: {}", search_url))?;
    url.query_pairs_mut().append_pair("api-key", api_key);
    Ok(url.into())
}

/// Score every article carrying a non-empty abstract, in document order
pub fn score_documents(comment_abstract: &str, search: &ArticleSearchResponse) -> Vec<ArticleScore> {
    let Some(docs) = search.docs() else {
        warn!("no articles found in the archive response");
        return Vec::new();
    };

    info!("scoring {} archive articles", docs.len());
    let mut scores = Vec::with_capacity(docs.len());
    for doc in docs {
        let Some(article_abstract) = doc.abstract_text.as_deref().filter(|a| !a.is_empty()) else {
            warn!(url = doc.web_url.as_deref().unwrap_or("-"), "no abstract available in this article");
            continue;
        };

        match cosine_similarity(comment_abstract, article_abstract) {
            Ok(score) => {
                info!(url = doc.web_url.as_deref().unwrap_or("-"), score, "scored article");
                scores.push(ArticleScore {
                    web_url: doc.web_url.clone(),
                    headline: doc.headline.as_ref().and_then(|h| h.main.clone()),
                    score,
                });
            }
            Err(e) => {
                warn!(url = doc.web_url.as_deref().unwrap_or("-"), "could not score article: {}", e);
            }
        }
    }
    scores
}

/// Client for the news archive Article Search API
pub struct ArchiveClient {
    api_key: String,
    client: Client,
}

impl ArchiveClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, common::DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(common::DEFAULT_USER_AGENT)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }

    /// Build a client from the `[archive]` section, reading the API key from the environment
    pub fn from_config(config: &common::ArchiveConfig) -> Result<Self> {
        let api_key = config.api_key().context("archive API key unavailable")?;
        Self::with_timeout(
            api_key,
            config.timeout_seconds.unwrap_or(common::DEFAULT_TIMEOUT_SECONDS),
        )
    }

    /// GET the search URL with the API key appended.
    ///
    /// Returns `Ok(None)` on a non-200 status after logging status and body;
    /// transport and decoding failures are errors.
    pub async fn search(&self, search_url: &str) -> Result<Option<ArticleSearchResponse>> {
        let request_url = append_api_key(search_url, &self.api_key)?;
        info!(url = %search_url, "making archive search call");

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .context("archive search request failed")?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "error in archive search call");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .context("failed to read archive response body")?;
        debug!(%body, "received archive data");

        let parsed: ArticleSearchResponse =
            serde_json::from_str(&body).context("Failed to parse archive search response")?;
        Ok(Some(parsed))
    }

    /// Search the archive and score each returned article against `comment_abstract`
    pub async fn score_articles(
        &self,
        search_url: &str,
        comment_abstract: &str,
    ) -> Result<Vec<ArticleScore>> {
        match self.search(search_url).await? {
            Some(search) => Ok(score_documents(comment_abstract, &search)),
            None => Ok(Vec::new()),
        }
    }
}
