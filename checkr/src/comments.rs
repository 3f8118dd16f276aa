use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// A single Reddit comment
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: Option<String>,
    pub created_utc: Option<DateTime<Utc>>,
    pub permalink: String,
}

/// Anything that can resolve a comment permalink to its text
#[async_trait::async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch_comment(&self, permalink: &str) -> Result<Comment>;
}

/// Extract the comment id from a permalink of the form
/// `/r/<sub>/comments/<post_id>/<slug>/<comment_id>/`.
pub fn comment_id_from_permalink(permalink: &str) -> Result<String> {
    let url = url::Url::parse(permalink)
        .with_context(|| format!("invalid comment permalink: {}", permalink))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let idx = segments
        .iter()
        .position(|s| *s == "comments")
        .with_context(|| format!("permalink has no 'comments' segment: {}", permalink))?;

    if segments.len() != idx + 4 {
        anyhow::bail!("permalink does not point at a comment: {}", permalink);
    }

    Ok(segments[idx + 3].to_string())
}

/// Reddit API client using application-only OAuth
pub struct RedditClient {
    client_id: String,
    client_secret: String,
    user_agent: String,
    auth_url: String,
    api_url: String,
    client: Client,
}

impl RedditClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self> {
        let user_agent = user_agent.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(common::DEFAULT_TIMEOUT_SECONDS))
            .user_agent(user_agent.clone())
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent,
            auth_url: common::DEFAULT_REDDIT_AUTH_URL.to_string(),
            api_url: common::DEFAULT_REDDIT_API_URL.to_string(),
            client,
        })
    }

    /// Point the client at other token/API endpoints (used by tests)
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(self.user_agent.clone())
            .build()
            .context("failed to build reqwest client")?;
        Ok(self)
    }

    /// Build a client from the `[reddit]` section, reading credentials from the environment
    pub fn from_config(config: &common::RedditConfig) -> Result<Self> {
        let client = Self::new(
            config.client_id().context("Reddit client id unavailable")?,
            config.client_secret().context("Reddit client secret unavailable")?,
            config
                .user_agent
                .clone()
                .unwrap_or_else(|| common::DEFAULT_USER_AGENT.to_string()),
        )?
        .with_endpoints(
            config
                .auth_url
                .clone()
                .unwrap_or_else(|| common::DEFAULT_REDDIT_AUTH_URL.to_string()),
            config
                .api_url
                .clone()
                .unwrap_or_else(|| common::DEFAULT_REDDIT_API_URL.to_string()),
        );

        match config.timeout_seconds {
            Some(secs) => client.with_timeout(secs),
            None => Ok(client),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Reddit token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit auth error {}: {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse Reddit token response")?;
        debug!(expires_in = ?token.expires_in, "obtained Reddit access token");
        Ok(token.access_token)
    }
}

#[async_trait::async_trait]
impl CommentSource for RedditClient {
    async fn fetch_comment(&self, permalink: &str) -> Result<Comment> {
        let id = comment_id_from_permalink(permalink)?;
        let token = self.access_token().await?;

        let info_url = format!("{}/api/info", self.api_url.trim_end_matches('/'));
        let fullname = format!("t1_{}", id);
        let response = self
            .client
            .get(&info_url)
            .bearer_auth(token)
            .query(&[("id", fullname.as_str()), ("raw_json", "1")])
            .send()
            .await
            .context("Reddit comment request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit API error {}: {}", status, body);
        }

        let listing: Listing = response
            .json()
            .await
            .context("Failed to parse Reddit listing")?;

        let data = listing
            .data
            .children
            .into_iter()
            .find(|child| child.kind == "t1")
            .map(|child| child.data)
            .with_context(|| format!("comment {} not found", id))?;

        let body = data
            .body
            .with_context(|| format!("comment {} has no body", id))?;

        let created_utc = data
            .created_utc
            .and_then(|ts| Utc.timestamp_opt(ts as i64, 0).single());

        info!(
            comment_id = %id,
            author = data.author.as_deref().unwrap_or("[unknown]"),
            created = ?created_utc,
            "fetched comment ({} chars)",
            body.len()
        );

        Ok(Comment {
            id,
            body,
            author: data.author,
            created_utc,
            permalink: permalink.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: CommentData,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_utc: Option<f64>,
}
