use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use parley_context::Turn;

use crate::provider::{Choice, Completion, CompletionBackend, CompletionError, CompletionOptions};

/// OpenAI chat-completions client.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    organization: Option<String>,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, organization: Option<String>, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            organization,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        turns: &[Turn],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionError> {
        let body = build_request_body(turns, options);
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(model = %options.model, turns = turns.len(), "sending request to OpenAI");

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(org) = &self.organization {
            request = request.header("OpenAI-Organization", org);
        }
        if options.timeout_ms > 0 {
            request = request.timeout(Duration::from_millis(options.timeout_ms));
        }

        let resp = request.send().await.map_err(|e| classify_transport(e, options))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(CompletionError::Api {
                status,
                message: extract_error_message(&text),
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        Ok(parse_response(api_resp))
    }
}

fn classify_transport(e: reqwest::Error, options: &CompletionOptions) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout {
            ms: options.timeout_ms,
        }
    } else {
        CompletionError::Http(e)
    }
}

fn build_request_body(turns: &[Turn], options: &CompletionOptions) -> serde_json::Value {
    // System instruction goes first, then the conversation in order.
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": options.system_instruction,
    })];

    for t in turns {
        messages.push(serde_json::json!({
            "role": t.role,
            "content": t.content,
        }));
    }

    let mut body = serde_json::json!({
        "model": options.model,
        "messages": messages,
    });
    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = max_tokens.into();
    }
    if let Some(temperature) = options.temperature {
        body["temperature"] = temperature.into();
    }
    if let Some(user) = &options.user {
        body["user"] = user.as_str().into();
    }
    body
}

/// Pull `error.message` out of an OpenAI error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn parse_response(resp: ApiResponse) -> Completion {
    Completion {
        model: resp.model,
        choices: resp
            .choices
            .into_iter()
            .map(|c| Choice {
                text: c.message.content.unwrap_or_default(),
            })
            .collect(),
        tokens_in: resp.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
        tokens_out: resp
            .usage
            .as_ref()
            .map(|u| u.completion_tokens)
            .unwrap_or(0),
    }
}

// OpenAI API response types (private, deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}
