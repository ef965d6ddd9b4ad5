use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FeedError, fetch_json};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";

const OPENAI_MODEL: &str = "gpt-4o";
const XAI_MODEL: &str = "grok-2-1212";

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI-compatible endpoints, JSON mode only.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    service: &'static str,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    pub fn openai(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::new(http, "openai", OPENAI_BASE_URL, OPENAI_MODEL, api_key)
    }

    /// xAI's Grok models.
    pub fn xai(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::new(http, "xai", XAI_BASE_URL, XAI_MODEL, api_key)
    }

    pub fn new(
        http: reqwest::Client,
        service: &'static str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            service,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Ask for a JSON object and decode it as `T`.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<T, FeedError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature,
        };

        let resp: ChatResponse = fetch_json(
            self.service,
            self.http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .timeout(TIMEOUT),
        )
        .await?;

        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FeedError::format(self.service, "empty completion"))?;
        debug!(service = self.service, bytes = content.len(), "completion received");

        serde_json::from_str(&content).map_err(|e| FeedError::format(self.service, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{http_client, serve};
    use axum::http::HeaderMap;
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    #[derive(Deserialize, Debug, PartialEq)]
    struct Answer {
        answer: u32,
    }

    async fn fake_completion(headers: HeaderMap, Json(req): Json<Value>) -> Json<Value> {
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(req["response_format"]["type"], "json_object");
        assert_eq!(req["model"], "test-model");
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"answer\": 42}" } }]
        }))
    }

    #[tokio::test]
    async fn decodes_json_content() {
        let base = serve(Router::new().route("/chat/completions", post(fake_completion))).await;
        let client = ChatClient::new(http_client(), "test", base, "test-model", "sk-test");

        let answer: Answer = client.complete_json("system", "prompt", 0.1).await.unwrap();
        assert_eq!(answer, Answer { answer: 42 });
    }

    #[tokio::test]
    async fn malformed_content_is_a_format_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [{ "message": { "content": "not json" } }] })) }),
        );
        let base = serve(router).await;
        let client = ChatClient::new(http_client(), "test", base, "m", "k");

        let err = client
            .complete_json::<Answer>("s", "p", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Format { .. }));
    }
}
