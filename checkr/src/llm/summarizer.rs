// Comment summarizer: asks the model for an archive search URL and a claim abstract
use anyhow::{Context, Result};
use tracing::info;

use super::{LlmProvider, LlmRequest, LlmResponse};
use crate::parser::ABSTRACT_MARKER;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Per-run prompt parameters taken from the `[llm]` and `[archive]` config sections
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub model: String,
    pub temperature: f32,
    pub search_endpoint: String,
    pub structured_output: bool,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            model: common::DEFAULT_LLM_MODEL.to_string(),
            temperature: common::DEFAULT_LLM_TEMPERATURE,
            search_endpoint: common::DEFAULT_SEARCH_ENDPOINT.to_string(),
            structured_output: false,
        }
    }
}

impl PromptSettings {
    pub fn from_config(config: &common::Config) -> Self {
        let llm = config.llm();
        let defaults = Self::default();
        Self {
            model: llm.model.unwrap_or(defaults.model),
            temperature: llm.temperature.unwrap_or(defaults.temperature),
            search_endpoint: config
                .archive()
                .search_endpoint
                .unwrap_or(defaults.search_endpoint),
            structured_output: llm.structured_output.unwrap_or(false),
        }
    }
}

/// Build the user prompt for one comment.
///
/// The free-text form asks for a URL starting with `<endpoint>?q=` and a line
/// starting with `Comment Abstract: `. The structured form asks for the same two
/// fields as a JSON object.
pub fn build_check_prompt(comment_text: &str, search_endpoint: &str, structured: bool) -> String {
    if structured {
        format!(
            r#"Generate a New York Times Article Search API URL (which should begin '{endpoint}?q=') with the 5 most important keywords related to the following text, and an abstract of the claim(s) being made in the text.

OUTPUT FORMAT (strict JSON):
{{
  "search_url": "{endpoint}?q=keyword1+keyword2+keyword3+keyword4+keyword5",
  "comment_abstract": "one-line abstract of the claim(s)"
}}

TEXT:
{text}
"#,
            endpoint = search_endpoint,
            text = comment_text
        )
    } else {
        format!(
            "Generate a New York Times Article Search API URL (which should begin '{}?q=') with the 5 most important keywords related to the following text, then print an abstract of the claim(s) being made in the text (which should begin '{}'): {}",
            search_endpoint, ABSTRACT_MARKER, comment_text
        )
    }
}

/// Send the comment to the model and return its raw answer.
/// Errors (auth, network, non-2xx) propagate to the caller.
pub async fn summarize_comment<P: LlmProvider + ?Sized>(
    provider: &P,
    comment_text: &str,
    settings: &PromptSettings,
) -> Result<LlmResponse> {
    let request = LlmRequest {
        system: Some(SYSTEM_PROMPT.to_string()),
        prompt: build_check_prompt(
            comment_text,
            &settings.search_endpoint,
            settings.structured_output,
        ),
        model: Some(settings.model.clone()),
        temperature: Some(settings.temperature),
        ..Default::default()
    };

    let response = provider
        .generate(request)
        .await
        .context("comment summarization request failed")?;

    info!(
        model = %response.model,
        total_tokens = response.usage.total_tokens,
        "received model response ({} chars)",
        response.content.len()
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::UsageMetadata;
    use std::sync::Mutex;

    struct RecordingProvider {
        seen: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(LlmResponse {
                content: "Comment Abstract: ok".to_string(),
                usage: UsageMetadata::default(),
                model: "stub".to_string(),
            })
        }
    }

    #[test]
    fn free_text_prompt_names_endpoint_and_marker() {
        let prompt = build_check_prompt("the moon is cheese", common::DEFAULT_SEARCH_ENDPOINT, false);
        assert!(prompt.contains(
            "'https://api.nytimes.com/svc/search/v2/articlesearch.json?q='"
        ));
        assert!(prompt.contains("'Comment Abstract: '"));
        assert!(prompt.contains("5 most important keywords"));
        assert!(prompt.ends_with("the moon is cheese"));
    }

    #[test]
    fn structured_prompt_asks_for_json_fields() {
        let prompt = build_check_prompt("text", "https://example.test/search", true);
        assert!(prompt.contains("\"search_url\""));
        assert!(prompt.contains("\"comment_abstract\""));
        assert!(prompt.contains("https://example.test/search?q="));
    }

    #[tokio::test]
    async fn summarize_sends_system_prompt_and_settings() {
        let provider = RecordingProvider {
            seen: Mutex::new(Vec::new()),
        };
        let settings = PromptSettings::default();

        let response = summarize_comment(&provider, "some comment", &settings)
            .await
            .expect("summarize");
        assert_eq!(response.content, "Comment Abstract: ok");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(seen[0].model.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(seen[0].temperature, Some(0.4));
        assert!(seen[0].prompt.contains("some comment"));
    }
}
