use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::archive::{ArchiveClient, ArticleScore};
use crate::comments::{Comment, CommentSource, RedditClient};
use crate::llm::remote::RemoteLlmProvider;
use crate::llm::summarizer::{summarize_comment, PromptSettings};
use crate::llm::LlmProvider;
use crate::parser::{ParsedResponse, ResponseParser};

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub comment: Comment,
    pub model_response: String,
    pub parsed: ParsedResponse,
    pub scores: Vec<ArticleScore>,
    /// Whether the archive was queried at all
    pub searched: bool,
}

impl CheckReport {
    /// Highest-scoring article, if any
    pub fn best_match(&self) -> Option<&ArticleScore> {
        self.scores
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// The comment checker with its collaborators, built once per process
pub struct Checkr {
    comments: Arc<dyn CommentSource>,
    llm: Arc<dyn LlmProvider>,
    archive: ArchiveClient,
    parser: ResponseParser,
    settings: PromptSettings,
}

impl Checkr {
    pub fn new(
        comments: Arc<dyn CommentSource>,
        llm: Arc<dyn LlmProvider>,
        archive: ArchiveClient,
        settings: PromptSettings,
    ) -> Result<Self> {
        let parser = ResponseParser::new(&settings.search_endpoint)?;
        Ok(Self {
            comments,
            llm,
            archive,
            parser,
            settings,
        })
    }

    /// Wire up the Reddit, LLM and archive clients described by `config`
    pub fn from_config(config: &common::Config) -> Result<Self> {
        let comments = RedditClient::from_config(&config.reddit())
            .context("failed to initialize Reddit client")?;
        let llm = RemoteLlmProvider::from_config(&config.llm())
            .context("failed to initialize LLM provider")?;
        info!(model = llm.model(), "LLM provider initialized");
        let archive = ArchiveClient::from_config(&config.archive())
            .context("failed to initialize archive client")?;

        Self::new(
            Arc::new(comments),
            Arc::new(llm),
            archive,
            PromptSettings::from_config(config),
        )
    }

    /// Run the full check for one comment permalink.
    ///
    /// Comment fetch and model failures are errors. A missing abstract or search
    /// URL ends the run early with an empty score list.
    pub async fn run(&self, permalink: &str) -> Result<CheckReport> {
        let comment = self
            .comments
            .fetch_comment(permalink)
            .await
            .with_context(|| format!("failed to fetch comment {}", permalink))?;

        let response = summarize_comment(self.llm.as_ref(), &comment.body, &self.settings).await?;
        let parsed = self.parser.parse(&response.content);

        let mut report = CheckReport {
            comment,
            model_response: response.content,
            parsed,
            scores: Vec::new(),
            searched: false,
        };

        let Some(comment_abstract) = report.parsed.comment_abstract.clone() else {
            warn!("skipping archive search: nothing to score against");
            return Ok(report);
        };
        info!(%comment_abstract, "comment abstract");

        let Some(search_url) = report.parsed.search_url.clone() else {
            warn!("skipping archive search: no search URL");
            return Ok(report);
        };

        report.scores = self
            .archive
            .score_articles(&search_url, &comment_abstract)
            .await?;
        report.searched = true;

        info!("scored {} articles", report.scores.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(scores: Vec<f64>) -> CheckReport {
        CheckReport {
            comment: Comment {
                id: "c1".into(),
                body: "body".into(),
                author: None,
                created_utc: None,
                permalink: "https://www.reddit.com/r/a/comments/b/c/c1/".into(),
            },
            model_response: String::new(),
            parsed: ParsedResponse::default(),
            scores: scores
                .into_iter()
                .map(|score| ArticleScore {
                    web_url: None,
                    headline: None,
                    score,
                })
                .collect(),
            searched: true,
        }
    }

    #[test]
    fn best_match_picks_highest_score() {
        let report = report_with(vec![0.2, 0.9, 0.5]);
        assert_eq!(report.best_match().map(|s| s.score), Some(0.9));
    }

    #[test]
    fn best_match_of_empty_report_is_none() {
        assert!(report_with(vec![]).best_match().is_none());
    }
}
