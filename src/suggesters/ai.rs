//! AI source backed by an OpenAI-compatible chat-completions endpoint.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::carousel::{RenderNotifier, SnapshotSlot, SuggestionQuery, Suggester, Ticket};
use crate::config::AiConfig;
use crate::error::CarouselError;

pub const AI_PREFIX: &str = "🤖";
const REQUEST_TIMEOUT_SECS: u64 = 20;
const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: u32 = 128;
const SYSTEM_PROMPT: &str = "You are a shell assistant that suggests terminal command completions.";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

// =============================================================================
// Suggester
// =============================================================================

pub struct AiSuggester {
    /// `None` disables the source.
    config: Option<AiConfig>,
    client: Client,
    slot: SnapshotSlot,
}

impl AiSuggester {
    pub fn new(config: Option<AiConfig>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            slot: SnapshotSlot::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// One completion for `prompt`.
    pub async fn generate(&self, config: &AiConfig, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", config.api_url);
        let request = ChatRequest {
            model: &config.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&config.api_key)
            .header("HTTP-Referer", "https://github.com/ubershmekel/caroushell")
            .header("X-Title", "Caroushell")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("sending request to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CarouselError::AiStatus { status }.into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("parsing chat completion response")?;
        Ok(body.text())
    }
}

#[async_trait]
impl Suggester for AiSuggester {
    fn prefix(&self) -> &str {
        AI_PREFIX
    }

    async fn init(&self) {
        if self.config.is_none() {
            tracing::info!("AI suggestions disabled: no API configuration");
        }
    }

    fn begin_refresh(&self) -> Ticket {
        self.slot.begin()
    }

    async fn refresh_suggestions(
        &self,
        ticket: Ticket,
        query: SuggestionQuery,
        max_displayed: usize,
        notifier: RenderNotifier,
    ) {
        let Some(config) = &self.config else {
            return;
        };
        let prompt = build_prompt(&query.current_row, &query.context, max_displayed);
        tracing::debug!(%prompt, "AI prompt");

        let start = Instant::now();
        let text = match self.generate(config, &prompt).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "AI request failed");
                return;
            }
        };
        let lines = parse_suggestions(&text, max_displayed);
        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            lines = lines.len(),
            "AI suggestions"
        );

        if self.slot.commit(ticket, lines) {
            notifier.request_render();
        }
    }

    fn latest(&self) -> Vec<String> {
        self.slot.latest()
    }
}

/// Prompt asking for `max_displayed` full commands, one per line.
pub fn build_prompt(current_row: &str, context: &[String], max_displayed: usize) -> String {
    format!(
        "You are a shell assistant. Given a partial shell input, suggest {max_displayed} \
         useful, concise shell commands that the user might run next. \
         Return one suggestion per line, no numbering, no extra text.\n\
         Return the whole suggestion, not just what remains to type out.\n\n\
         The current line is: \"{current_row}\"\n\n{}\n",
        context.join("\n\n")
    )
}

/// Non-empty trimmed lines of `text`, at most `max`.
pub fn parse_suggestions(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_row_and_context() {
        let context = vec!["recent: make".to_string(), "# File context".to_string()];
        let prompt = build_prompt("git co", &context, 3);
        assert!(prompt.contains("suggest 3 useful"));
        assert!(prompt.contains("The current line is: \"git co\""));
        assert!(prompt.contains("recent: make\n\n# File context"));
    }

    #[test]
    fn test_suggestions_are_trimmed_and_capped() {
        let text = "  git commit\r\n\n git checkout main \ngit cherry-pick\n";
        assert_eq!(parse_suggestions(text, 2), vec!["git commit", "git checkout main"]);
        assert!(parse_suggestions("", 2).is_empty());
    }

    #[test]
    fn test_response_text_extraction() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"ls -la\npwd"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "ls -la\npwd");

        let empty: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let request = ChatRequest {
            model: "m",
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn test_disabled_source_stays_empty() {
        let ai = AiSuggester::new(None);
        assert!(!ai.is_enabled());
        ai.init().await;
        let query = SuggestionQuery {
            current_row: "ls".into(),
            cursor: 2,
            word: Default::default(),
            context: Vec::new(),
        };
        ai.refresh_suggestions(ai.begin_refresh(), query, 2, RenderNotifier::detached()).await;
        assert!(ai.latest().is_empty());
        assert_eq!(ai.description_for_ai(), "");
    }
}
