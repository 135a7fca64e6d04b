//! OpenAI-compatible text-completion client.
//!
//! One request per call, no retry: a failed completion surfaces to the user
//! as-is and they simply try again. The API key is an argument to every call
//! rather than client state, so concurrent requests carrying different
//! credentials never interfere.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token budget for SQL and prompt-suggestion completions.
pub const SQL_MAX_TOKENS: u32 = 500;
/// Token budget for chart pseudo-code completions.
pub const CHART_MAX_TOKENS: u32 = 300;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const STOP_SEQUENCE: &str = "\n\n";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion service returned no choices")]
    EmptyChoices,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stop: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

/// A generated completion: trimmed text plus the token usage the service
/// reported for the whole exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl CompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    /// Single text-completion attempt against `<base_url>/completions`.
    pub async fn complete(
        &self,
        api_key: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, CompletionError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            temperature,
            max_tokens,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: vec![STOP_SEQUENCE],
        };

        log::debug!(
            "Requesting completion: model={}, temperature={}, max_tokens={}",
            self.model,
            temperature,
            max_tokens
        );

        let response = self
            .http
            .post(format!("{}/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let parsed: CompletionResponse = response.json().await?;
        into_completion(parsed)
    }
}

fn into_completion(response: CompletionResponse) -> Result<Completion, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(CompletionError::EmptyChoices)?;
    Ok(Completion {
        text: choice.text.trim().to_string(),
        total_tokens: response.usage.total_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo-instruct",
            prompt: "SELECT",
            temperature: 0.2,
            max_tokens: SQL_MAX_TOKENS,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: vec![STOP_SEQUENCE],
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo-instruct");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["top_p"], 1.0);
        assert_eq!(body["stop"][0], "\n\n");
    }

    #[test]
    fn test_response_parsing_and_trimming() {
        let raw = r#"{
            "choices": [{"text": "\n  SELECT * FROM orders  "}],
            "usage": {"total_tokens": 42}
        }"#;

        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(parsed).unwrap();
        assert_eq!(completion.text, "SELECT * FROM orders");
        assert_eq!(completion.total_tokens, 42);
    }

    #[test]
    fn test_response_extra_fields_ignored() {
        let raw = r#"{
            "id": "cmpl-1",
            "object": "text_completion",
            "choices": [{"text": "SELECT 1", "index": 0, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(parsed).unwrap();
        assert_eq!(completion.text, "SELECT 1");
        assert_eq!(completion.total_tokens, 15);
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let raw = r#"{"choices": [], "usage": {"total_tokens": 3}}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            into_completion(parsed),
            Err(CompletionError::EmptyChoices)
        ));
    }
}
