//! LLM Client: the single point of entry for all Gemini API calls in JobWise.
//!
//! ARCHITECTURAL RULE: No other module may call the generation endpoint directly.
//! Handlers depend on the `TextGenerator` trait; `GeminiClient` is the production backend.
//!
//! One POST per call. No retry, no status gate: a non-success body is decoded like any
//! other and surfaces as a response without candidates.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn user_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

/// Decoded `generateContent` body. Every level is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    /// Present when the endpoint answered with an error envelope.
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl GenerateContentResponse {
    /// Decodes a raw body. An empty body is an empty response, not an error.
    pub fn from_body(body: &str) -> Result<Self, LlmError> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(body)?)
    }

    /// The candidate list, or `None` when it is absent or empty.
    pub fn candidates(&self) -> Option<&[Candidate]> {
        self.candidates.as_deref().filter(|c| !c.is_empty())
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.as_ref().map_or(0, Vec::len)
    }
}

impl Candidate {
    /// The candidate's parts, or `None` when `content` or `parts` is missing.
    pub fn parts(&self) -> Option<&[Part]> {
        self.content.as_ref()?.parts.as_deref()
    }
}

impl Part {
    /// Fragment text; a part without text renders as an empty fragment.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Backend that turns a prompt into a model response.
///
/// Carried in `AppState` as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.gemini_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.gemini_base_url, config.gemini_model
            ),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError> {
        let request_body = GenerateContentRequest::user_prompt(prompt);
        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling generateContent");

        // The key rides in the query string, so URLs are stripped from transport errors.
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.without_url()))?;

        if !status.is_success() {
            warn!("generateContent returned {status}; decoding body anyway");
        }

        let decoded = GenerateContentResponse::from_body(&body)?;
        if let Some(err) = &decoded.error {
            warn!(
                code = ?err.code,
                status = ?err.status,
                "generateContent error: {}",
                err.message.as_deref().unwrap_or("<no message>")
            );
        }
        debug!(candidates = decoded.candidate_count(), "generateContent call finished");

        Ok(decoded)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn config_for(base_url: &str) -> Config {
        Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            "GEMINI_BASE_URL" => Some(base_url.to_string()),
            _ => None,
        })
        .unwrap()
    }

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    /// Echoes the model path segment, key, and prompt back as a single candidate part.
    async fn echo(
        Path(model_action): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let key = query.get("key").cloned().unwrap_or_default();
        let role = body["contents"][0]["role"].as_str().unwrap_or_default().to_string();
        let prompt = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        Json(json!({
            "candidates": [{
                "content": {"parts": [{"text": format!("{model_action}|{key}|{role}|{prompt}")}]},
                "finishReason": "STOP"
            }]
        }))
    }

    #[test]
    fn test_request_envelope_shape() {
        let body = serde_json::to_value(GenerateContentRequest::user_prompt("hi")).unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn test_empty_body_decodes_to_no_candidates() {
        let decoded = GenerateContentResponse::from_body("  \n").unwrap();
        assert!(decoded.candidates().is_none());
        assert!(decoded.error.is_none());
    }

    #[test]
    fn test_error_envelope_decodes_without_candidates() {
        let decoded = GenerateContentResponse::from_body(
            r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#,
        )
        .unwrap();
        assert!(decoded.candidates().is_none());
        assert_eq!(decoded.error.unwrap().code, Some(400));
    }

    #[test]
    fn test_non_json_body_is_parse_error() {
        assert!(matches!(
            GenerateContentResponse::from_body("<html>502</html>"),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_candidate_list_is_none() {
        let decoded = GenerateContentResponse::from_body(r#"{"candidates": []}"#).unwrap();
        assert!(decoded.candidates().is_none());
        assert_eq!(decoded.candidate_count(), 0);
    }

    #[test]
    fn test_missing_levels_are_explicit_nones() {
        let decoded = GenerateContentResponse::from_body(
            r#"{"candidates": [{}, {"content": {}}, {"content": {"parts": [{}]}}]}"#,
        )
        .unwrap();
        let candidates = decoded.candidates().unwrap();
        assert!(candidates[0].parts().is_none());
        assert!(candidates[1].parts().is_none());
        let parts = candidates[2].parts().unwrap();
        assert_eq!(parts[0].text(), "");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let decoded = GenerateContentResponse::from_body(
            r#"{"candidates": [{"content": {"parts": [{"text": "ok"}], "role": "model"}, "index": 0}],
                "usageMetadata": {"promptTokenCount": 3}}"#,
        )
        .unwrap();
        let parts = decoded.candidates().unwrap()[0].parts().unwrap();
        assert_eq!(parts[0].text(), "ok");
    }

    #[test]
    fn test_endpoint_is_built_from_config() {
        let client = GeminiClient::new(&config_for("https://example.test/v1beta")).unwrap();
        assert_eq!(
            client.endpoint,
            "https://example.test/v1beta/models/gemini-1.5-flash-latest:generateContent"
        );
        assert_eq!(client.model(), "gemini-1.5-flash-latest");
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_with_key_in_query() {
        let base = spawn_server(Router::new().route("/v1beta/models/:model_action", post(echo))).await;
        let client = GeminiClient::new(&config_for(&base)).unwrap();

        let response = client.generate("Rephrase this").await.unwrap();
        let parts = response.candidates().unwrap()[0].parts().unwrap();
        assert_eq!(
            parts[0].text(),
            "gemini-1.5-flash-latest:generateContent|test-key|user|Rephrase this"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_still_decoded() {
        let app = Router::new().route(
            "/v1beta/models/:model_action",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"code": 400, "message": "bad key", "status": "INVALID_ARGUMENT"}})),
                )
            }),
        );
        let base = spawn_server(app).await;
        let client = GeminiClient::new(&config_for(&base)).unwrap();

        let response = client.generate("anything").await.unwrap();
        assert!(response.candidates().is_none());
        assert_eq!(response.error.unwrap().message.as_deref(), Some("bad key"));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_without_key() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new(&config_for(&format!("http://{addr}/v1beta"))).unwrap();
        let err = client.generate("anything").await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
        assert!(!err.to_string().contains("test-key"));
    }
}
