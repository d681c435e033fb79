use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{CompletionRequest, LlmClient, Provider};
use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAiClient {
    /// Builds the client without requiring a credential; a missing key is
    /// reported when a completion is requested.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.openai_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: settings.openai_api_key.clone(),
            base_url: settings.openai_base_url.clone(),
            model: settings.openai_model.clone(),
            temperature: settings.openai_temperature,
            max_retries: settings.openai_max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn diagnostics(stage: &'static str, detail: String) -> LlmDiagnosticsError {
        LlmDiagnosticsError {
            provider: Provider::OpenAI,
            stage,
            detail,
            raw_output: None,
            raw_response_json: None,
        }
    }

    async fn create_completion(
        &self,
        api_key: &str,
        req: &ChatCompletionRequest,
    ) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| Self::diagnostics("transport", format!("OpenAI request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Self::diagnostics("transport", format!("failed to read OpenAI response body: {e}")))?;

        if !status.is_success() {
            let stage = match status {
                StatusCode::TOO_MANY_REQUESTS => "rate_limited",
                s if s.is_server_error() => "upstream",
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "credential",
                _ => "http",
            };
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                raw_output: Some(text),
                raw_response_json,
                ..Self::diagnostics(stage, format!("status={status}"))
            }
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| {
            LlmDiagnosticsError {
                raw_output: Some(text.clone()),
                ..Self::diagnostics("decode", format!("failed to decode chat completion: {e}"))
            }
            .into()
        })
    }

    fn response_text(res: ChatCompletionResponse) -> anyhow::Result<String> {
        let choice = res
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Self::diagnostics("decode", "completion has no choices".to_string()))?;

        if matches!(choice.finish_reason.as_deref(), Some("length")) {
            tracing::warn!("OpenAI completion stopped at the token limit; JSON may be truncated");
        }

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Self::diagnostics("decode", "completion content is empty".to_string()).into());
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Self::diagnostics("credential", "OPENAI_API_KEY is required".to_string())
        })?;

        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: request.system,
                },
                Message {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: self.temperature,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.create_completion(api_key, &req).await {
                Ok(res) => {
                    tracing::info!(model = %self.model, attempt, "received OpenAI completion");
                    return Self::response_text(res);
                }
                Err(err) => {
                    let retryable = err
                        .downcast_ref::<LlmDiagnosticsError>()
                        .is_some_and(LlmDiagnosticsError::is_retryable);
                    if !retryable || attempt > self.max_retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1).min(5));
                    tracing::warn!(attempt, ?backoff, error = %err, "OpenAI request failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Stub {
        calls: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
        fail_first: usize,
        status: u16,
    }

    async fn stub_handler(
        State(stub): State<Stub>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (axum::http::StatusCode, Json<Value>) {
        let n = stub.calls.fetch_add(1, Ordering::SeqCst);
        *stub.last_body.lock().unwrap() = Some(body);

        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-key");
        if !authorized {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"message": "bad key"}})),
            );
        }
        if n < stub.fail_first {
            let status = axum::http::StatusCode::from_u16(stub.status).unwrap();
            return (status, Json(json!({"error": {"message": "try later"}})));
        }

        (
            axum::http::StatusCode::OK,
            Json(json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "```json\n{\"ok\": true}\n```"},
                    "finish_reason": "stop"
                }]
            })),
        )
    }

    async fn spawn_stub(stub: Stub) -> String {
        let app = Router::new()
            .route("/v1/chat/completions", post(stub_handler))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn settings(base_url: String, api_key: Option<&str>, max_retries: u32) -> Settings {
        Settings {
            openai_api_key: api_key.map(str::to_string),
            openai_base_url: base_url,
            openai_max_retries: max_retries,
            openai_timeout_secs: 5,
            ..Settings::default()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system text".to_string(),
            user: "user text".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_roles_model_and_temperature() {
        let stub = Stub::default();
        let base_url = spawn_stub(stub.clone()).await;
        let client = OpenAiClient::from_settings(&settings(base_url, Some("test-key"), 0)).unwrap();

        let text = client.complete(request()).await.unwrap();
        assert_eq!(text, "```json\n{\"ok\": true}\n```");

        let body = stub.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "user text");
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_upstream() {
        let stub = Stub::default();
        let base_url = spawn_stub(stub.clone()).await;
        let client = OpenAiClient::from_settings(&settings(base_url, None, 0)).unwrap();

        let err = client.complete(request()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "credential");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_key_is_not_retried() {
        let stub = Stub::default();
        let base_url = spawn_stub(stub.clone()).await;
        let client = OpenAiClient::from_settings(&settings(base_url, Some("wrong"), 3)).unwrap();

        let err = client.complete(request()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "credential");
        assert!(diag.raw_output.as_deref().unwrap().contains("bad key"));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_attempt_by_default() {
        let stub = Stub {
            fail_first: 1,
            status: 503,
            ..Stub::default()
        };
        let base_url = spawn_stub(stub.clone()).await;
        let client = OpenAiClient::from_settings(&settings(base_url, Some("test-key"), 0)).unwrap();

        let err = client.complete(request()).await.unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "upstream");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limited_requests_when_configured() {
        let stub = Stub {
            fail_first: 1,
            status: 429,
            ..Stub::default()
        };
        let base_url = spawn_stub(stub.clone()).await;
        let client = OpenAiClient::from_settings(&settings(base_url, Some("test-key"), 1)).unwrap();

        let text = client.complete(request()).await.unwrap();
        assert!(text.contains("\"ok\""));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_content_is_an_error() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(OpenAiClient::response_text(res).is_err());

        let res: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(OpenAiClient::response_text(res).is_err());
    }
}
