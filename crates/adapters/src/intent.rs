// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intent classification for free-form review comments.
//!
//! The default parser sends the comment to an LLM messages endpoint and
//! decodes the model's JSON reply into a [`ParsedIntent`]. Other
//! strategies can be plugged in behind [`IntentParser`]; the router
//! treats any parser failure as "no intent" and keeps going.

use async_trait::async_trait;
use familiar_config::LlmSection;
use familiar_core::ParsedIntent;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CLASSIFIER_INSTRUCTION: &str = "You classify code-review comments addressed to an \
automated coding agent. Reply with a single JSON object and nothing else: \
{\"instructions\": string, \"requested_actions\": array, \"confidence\": number}. \
`instructions` distills what the commenter wants done. `requested_actions` lists the \
privileged operations the comment explicitly asks for, drawn from \
[\"merge\", \"approve\", \"dismiss_reviews\", \"push\"]; leave it empty unless the \
request is explicit. `confidence` is your confidence in the classification, 0 to 1.";

#[derive(Debug, Error)]
pub enum ParseIntentError {
    #[error("intent request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("intent endpoint returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("intent endpoint returned no content")]
    Empty,
    #[error("failed to decode intent payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Capability: turn comment text into a structured intent.
#[async_trait]
pub trait IntentParser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<ParsedIntent, ParseIntentError>;
}

/// Parser backed by an Anthropic-style `/v1/messages` endpoint.
pub struct LlmIntentParser {
    client: reqwest::Client,
    cfg: LlmSection,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

impl LlmIntentParser {
    pub fn new(cfg: LlmSection) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, cfg }
    }

    async fn request_once(&self, text: &str) -> Result<ParsedIntent, ParseIntentError> {
        let url = format!("{}/v1/messages", self.cfg.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.cfg.model,
            "max_tokens": 1024,
            "system": CLASSIFIER_INSTRUCTION,
            "messages": [{"role": "user", "content": text}],
        });
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.cfg.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ParseIntentError::Http)?;
        if !response.status().is_success() {
            return Err(ParseIntentError::Status(response.status()));
        }
        let decoded: MessagesResponse = response
            .json()
            .await
            .map_err(ParseIntentError::Http)?;
        let payload = decoded
            .content
            .iter()
            .find(|block| block.kind == "text" && !block.text.trim().is_empty())
            .ok_or(ParseIntentError::Empty)?;
        decode_intent(&payload.text, text)
    }
}

#[async_trait]
impl IntentParser for LlmIntentParser {
    /// Retries only on 5xx responses, up to `llm.max_attempts` total
    /// attempts. 4xx and decode failures are terminal.
    async fn parse(&self, text: &str) -> Result<ParsedIntent, ParseIntentError> {
        let attempts = self.cfg.max_attempts.max(1);
        let mut last = None;
        for attempt in 0..attempts {
            match self.request_once(text).await {
                Ok(intent) => return Ok(intent),
                Err(ParseIntentError::Status(status)) if status.is_server_error() => {
                    tracing::warn!(%status, attempt, "intent endpoint 5xx, retrying");
                    last = Some(ParseIntentError::Status(status));
                }
                Err(err) => return Err(err),
            }
        }
        Err(last.unwrap_or(ParseIntentError::Empty))
    }
}

/// Decode the model's text payload. The payload must be a JSON object
/// matching [`ParsedIntent`] minus `raw_text`, which is filled from the
/// original comment.
fn decode_intent(payload: &str, raw_text: &str) -> Result<ParsedIntent, ParseIntentError> {
    let trimmed = strip_code_fence(payload.trim());
    let mut intent: ParsedIntent =
        serde_json::from_str(trimmed).map_err(ParseIntentError::Decode)?;
    intent.raw_text = raw_text.to_string();
    Ok(intent)
}

/// Models occasionally wrap the JSON in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n').trim_end_matches('`').trim_end()
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
