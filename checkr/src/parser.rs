//! Extraction of the search URL and the comment abstract from a model answer.
//!
//! Both fields are optional: a missing field is reported with a `warn!` event
//! and comes back as `None`, never as an error. First match wins.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::llm::extract_json_from_text;

/// Literal prefix of the abstract line in free-text answers
pub const ABSTRACT_MARKER: &str = "Comment Abstract: ";

static ABSTRACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Comment Abstract: (.*)").expect("invalid abstract regex"));

/// Fields pulled out of one model answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub comment_abstract: Option<String>,
    pub search_url: Option<String>,
}

/// Shape of a structured (JSON) answer
#[derive(Debug, Deserialize)]
struct StructuredAnswer {
    #[serde(default)]
    search_url: Option<String>,
    #[serde(default, alias = "abstract")]
    comment_abstract: Option<String>,
}

/// Return the text following `Comment Abstract: ` up to the end of that line
pub fn extract_abstract(text: &str) -> Option<String> {
    ABSTRACT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('\r').to_string())
        .filter(|s| !s.trim().is_empty())
}

/// Matches search URLs for one archive endpoint
#[derive(Debug, Clone)]
pub struct ResponseParser {
    url_re: Regex,
}

impl Default for ResponseParser {
    fn default() -> Self {
        static DEFAULT_URL_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(&url_pattern(common::DEFAULT_SEARCH_ENDPOINT))
                .expect("invalid default search url regex")
        });
        Self {
            url_re: DEFAULT_URL_RE.clone(),
        }
    }
}

fn url_pattern(endpoint: &str) -> String {
    format!(r"{}\?q=[\w%+]+", regex::escape(endpoint))
}

impl ResponseParser {
    /// Build a parser for URLs of the form `<endpoint>?q=<keywords>`
    pub fn new(endpoint: &str) -> Result<Self> {
        let url_re = Regex::new(&url_pattern(endpoint))
            .with_context(|| format!("invalid search endpoint pattern: {}", endpoint))?;
        Ok(Self { url_re })
    }

    /// First well-formed search URL in `text`, query string included
    pub fn extract_search_url(&self, text: &str) -> Option<String> {
        self.url_re.find(text).map(|m| m.as_str().to_string())
    }

    /// Extract both fields, preferring a structured JSON answer when present
    pub fn parse(&self, text: &str) -> ParsedResponse {
        let structured = extract_json_from_text(text)
            .and_then(|json| serde_json::from_str::<StructuredAnswer>(&json).ok());

        let (json_abstract, json_url) = match structured {
            Some(answer) => (answer.comment_abstract, answer.search_url),
            None => (None, None),
        };

        let comment_abstract = json_abstract
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| extract_abstract(text));

        let search_url = json_url
            .and_then(|url| self.extract_search_url(&url))
            .or_else(|| self.extract_search_url(text));

        if comment_abstract.is_none() {
            warn!("no comment abstract found in the model response");
        }
        if search_url.is_none() {
            warn!(pattern = %self.url_re.as_str(), "no valid archive search URL found in the model response");
        }

        ParsedResponse {
            comment_abstract,
            search_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = "Here is the URL:\n\
        https://api.nytimes.com/svc/search/v2/articlesearch.json?q=climate+change+arctic+ice+melting\n\n\
        Comment Abstract: The commenter claims Arctic ice is melting faster than predicted.\n";

    #[test]
    fn extracts_both_fields_from_free_text() {
        let parsed = ResponseParser::default().parse(ANSWER);
        assert_eq!(
            parsed.comment_abstract.as_deref(),
            Some("The commenter claims Arctic ice is melting faster than predicted.")
        );
        assert_eq!(
            parsed.search_url.as_deref(),
            Some("https://api.nytimes.com/svc/search/v2/articlesearch.json?q=climate+change+arctic+ice+melting")
        );
    }

    #[test]
    fn missing_marker_yields_no_abstract() {
        let text = "https://api.nytimes.com/svc/search/v2/articlesearch.json?q=a+b\nAbstract: nope";
        let parsed = ResponseParser::default().parse(text);
        assert!(parsed.comment_abstract.is_none());
        assert!(parsed.search_url.is_some());
    }

    #[test]
    fn missing_url_yields_no_url() {
        let text = "Search for https://www.nytimes.com/search?query=x\nComment Abstract: something";
        let parsed = ResponseParser::default().parse(text);
        assert!(parsed.search_url.is_none());
        assert_eq!(parsed.comment_abstract.as_deref(), Some("something"));
    }

    #[test]
    fn url_without_keywords_is_rejected() {
        let text = "https://api.nytimes.com/svc/search/v2/articlesearch.json?q=";
        assert!(ResponseParser::default().extract_search_url(text).is_none());
    }

    #[test]
    fn url_match_stops_at_disallowed_characters() {
        let text = "URL: `https://api.nytimes.com/svc/search/v2/articlesearch.json?q=vaccine+autism%20study&fq=x`";
        assert_eq!(
            ResponseParser::default().extract_search_url(text).as_deref(),
            Some("https://api.nytimes.com/svc/search/v2/articlesearch.json?q=vaccine+autism%20study")
        );
    }

    #[test]
    fn first_match_wins() {
        let text = "Comment Abstract: first\nComment Abstract: second\n\
            https://api.nytimes.com/svc/search/v2/articlesearch.json?q=one \
            https://api.nytimes.com/svc/search/v2/articlesearch.json?q=two";
        let parsed = ResponseParser::default().parse(text);
        assert_eq!(parsed.comment_abstract.as_deref(), Some("first"));
        assert!(parsed.search_url.unwrap().ends_with("q=one"));
    }

    #[test]
    fn empty_abstract_counts_as_missing() {
        assert!(extract_abstract("Comment Abstract: \nmore").is_none());
    }

    #[test]
    fn structured_answer_is_preferred() {
        let text = r#"```json
{
  "search_url": "https://api.nytimes.com/svc/search/v2/articlesearch.json?q=moon+landing+hoax",
  "comment_abstract": "The moon landing was staged."
}
```"#;
        let parsed = ResponseParser::default().parse(text);
        assert_eq!(parsed.comment_abstract.as_deref(), Some("The moon landing was staged."));
        assert_eq!(
            parsed.search_url.as_deref(),
            Some("https://api.nytimes.com/svc/search/v2/articlesearch.json?q=moon+landing+hoax")
        );
    }

    #[test]
    fn structured_url_must_match_endpoint() {
        let text = r#"{"search_url": "https://evil.test/?q=x", "comment_abstract": "claim"}"#;
        let parsed = ResponseParser::default().parse(text);
        assert!(parsed.search_url.is_none());
        assert_eq!(parsed.comment_abstract.as_deref(), Some("claim"));
    }

    #[test]
    fn custom_endpoint_is_escaped() {
        let parser = ResponseParser::new("https://archive.example.org/search.json").expect("parser");
        assert_eq!(
            parser
                .extract_search_url("go to https://archive.example.org/search.json?q=tax+cuts now")
                .as_deref(),
            Some("https://archive.example.org/search.json?q=tax+cuts")
        );
        // '.' in the endpoint is literal
        assert!(parser
            .extract_search_url("https://archive.example.org/searchXjson?q=tax")
            .is_none());
    }
}
