//! Gemini (Google) image editing client.

use crate::config::StudioConfig;
use crate::error::{sanitize_error_message, Result, StudioError};
use crate::image::EncodedImage;
use crate::transform::transformer::{first_image, ImageTransformer, ResponsePart};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Restyles portraits with a Gemini image model.
pub struct GeminiTransformer {
    client: reqwest::Client,
    config: StudioConfig,
}

impl GeminiTransformer {
    /// Creates a transformer from the given config.
    ///
    /// Never fails: a missing API key surfaces on the first [`transform`](ImageTransformer::transform).
    pub fn new(config: StudioConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Returns the active config.
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    fn require_api_key(&self) -> Result<&str> {
        self.config.api_key().ok_or(StudioError::MissingApiKey)
    }

    async fn transform_impl(&self, image: &EncodedImage) -> Result<EncodedImage> {
        let api_key = self.require_api_key()?;
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint,
            self.config.model.as_str(),
        );

        let body = GeminiRequest::new(image, &self.config.instruction);

        tracing::debug!(
            model = %self.config.model,
            mime_type = image.mime_type(),
            payload_len = image.data().len(),
            "submitting Gemini transform request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let stop_reason = gemini_response.stop_reason();
        let edited = first_image(gemini_response.into_parts()).ok_or_else(|| {
            if let Some(ref reason) = stop_reason {
                tracing::warn!(reason = %reason, "Gemini returned no image");
            }
            StudioError::NoImage
        })?;

        tracing::debug!(
            mime_type = edited.mime_type(),
            payload_len = edited.data().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini transform complete"
        );

        Ok(edited)
    }

    /// Checks that the model is reachable with the configured key.
    pub async fn health_check(&self) -> Result<()> {
        let api_key = self.require_api_key()?;
        let url = format!(
            "{}/models/{}",
            self.config.endpoint,
            self.config.model.as_str(),
        );

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &text))
    }
}

#[async_trait]
impl ImageTransformer for GeminiTransformer {
    async fn transform(&self, image: &EncodedImage) -> Result<EncodedImage> {
        self.transform_impl(image).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

/// Maps a non-2xx response to an error, keeping the service's own message.
fn parse_error(status: u16, text: &str) -> StudioError {
    let message = serde_json::from_str::<GeminiErrorBody>(text)
        .ok()
        .and_then(|body| body.error.message)
        .map(|m| sanitize_error_message(&m))
        .unwrap_or_else(|| sanitize_error_message(text));
    StudioError::Api { status, message }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn new(image: &EncodedImage, instruction: &str) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: image.data().to_string(),
                },
            },
            GeminiRequestPart::Text {
                text: instruction.to_string(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl GeminiResponse {
    /// Why the service stopped, if it said anything beyond a normal stop.
    ///
    /// Prompt blocks and safety finishes arrive with HTTP 200 and no image;
    /// the reason is only logged, the caller still sees an empty result.
    fn stop_reason(&self) -> Option<String> {
        if let Some(feedback) = &self.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                let detail = feedback.block_reason_message.as_ref().unwrap_or(reason);
                return Some(format!("prompt blocked: {detail}"));
            }
        }
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
            .filter(|reason| *reason != "STOP")
            .map(|reason| format!("finish reason: {reason}"))
    }

    /// Flattens the first candidate into ordered parts.
    fn into_parts(self) -> Vec<ResponsePart> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Vec::new();
        };

        candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match (part.inline_data, part.text) {
                (Some(inline), _) => Some(ResponsePart::Image(EncodedImage::new(
                    inline.mime_type,
                    inline.data,
                ))),
                (None, Some(text)) => Some(ResponsePart::Text(text)),
                (None, None) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiModel;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn portrait() -> EncodedImage {
        EncodedImage::parse("data:image/png;base64,iVBORw0KGgo=")
    }

    /// Serves a single canned HTTP response and hands back the raw request.
    async fn serve_once(
        status: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}/v1beta"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn transformer(endpoint: &str) -> GeminiTransformer {
        GeminiTransformer::new(
            StudioConfig::new()
                .with_api_key("test-key")
                .with_endpoint(endpoint),
        )
    }

    #[test]
    fn test_request_construction() {
        let req = GeminiRequest::new(&portrait(), "Make it vogue");
        assert_eq!(req.contents.len(), 1);
        assert_eq!(req.contents[0].parts.len(), 2);

        let json = serde_json::to_value(&req).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inline_data"]["data"], "iVBORw0KGgo=");
        assert_eq!(parts[1]["text"], "Make it vogue");
        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_response_parts_in_order() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "BBBB"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let parts = resp.into_parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ResponsePart::Text("Here you go".into()));
        assert_eq!(
            first_image(parts),
            Some(EncodedImage::new("image/png", "AAAA"))
        );
    }

    #[test]
    fn test_response_without_candidates_has_no_parts() {
        let resp: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(resp.into_parts().is_empty());
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.stop_reason().as_deref(),
            Some("prompt blocked: Prompt was blocked due to safety")
        );
        assert!(resp.into_parts().is_empty());
    }

    #[test]
    fn test_safety_finish_keeps_image_parts() {
        let json = r#"{"candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AAAA"}}]},
            "finishReason": "IMAGE_SAFETY"
        }]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.stop_reason().as_deref(),
            Some("finish reason: IMAGE_SAFETY")
        );
        assert_eq!(
            first_image(resp.into_parts()),
            Some(EncodedImage::new("image/png", "AAAA"))
        );
    }

    #[test]
    fn test_normal_stop_has_no_reason() {
        let json = r#"{"candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(resp.stop_reason().is_none());
    }

    #[test]
    fn test_parse_error_uses_service_message() {
        let body = r#"{"error": {"code": 400, "message": "Image payload is invalid", "status": "INVALID_ARGUMENT"}}"#;
        match parse_error(400, body) {
            StudioError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Image payload is invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_without_message_falls_back() {
        let err = parse_error(503, "");
        assert_eq!(err.user_message(), crate::error::GENERIC_FAILURE);

        let err = parse_error(500, "upstream exploded");
        assert_eq!(err.user_message(), "upstream exploded");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        // Port 9 is never contacted: the key check comes first.
        let transformer = GeminiTransformer::new(
            StudioConfig::new().with_endpoint("http://127.0.0.1:9/v1beta"),
        );
        let err = transformer.transform(&portrait()).await.unwrap_err();
        assert!(matches!(err, StudioError::MissingApiKey));
        assert_eq!(
            err.user_message(),
            "API Key is missing. Please ensure it is configured."
        );
    }

    #[tokio::test]
    async fn test_transform_returns_first_image() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "A cowboy kofia look"},
            {"inlineData": {"mimeType": "image/png", "data": "ZWRpdGVk"}}
        ]}, "finishReason": "STOP"}]}"#;
        let (endpoint, server) = serve_once("200 OK", body.to_string()).await;

        let edited = transformer(&endpoint)
            .transform(&portrait())
            .await
            .unwrap();
        assert_eq!(edited.to_data_url(), "data:image/png;base64,ZWRpdGVk");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash-image:generateContent"));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains("iVBORw0KGgo="));
        assert!(request.contains("cowboy kofia"));
    }

    #[tokio::test]
    async fn test_transform_text_only_response() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "Sorry, I can only describe this photo."}
        ]}}]}"#;
        let (endpoint, server) = serve_once("200 OK", body.to_string()).await;

        let err = transformer(&endpoint)
            .transform(&portrait())
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::NoImage));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_transform_safety_finish_without_image() {
        let body = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let (endpoint, server) = serve_once("200 OK", body.to_string()).await;

        let err = transformer(&endpoint)
            .transform(&portrait())
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::NoImage));
        assert_eq!(
            err.user_message(),
            "Failed to receive an edited image from the AI. It might have only returned text."
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_transform_blocked_wording_passes_through() {
        let body = r#"{"error": {"code": 400, "message": "Request blocked by safety settings", "status": "INVALID_ARGUMENT"}}"#;
        let (endpoint, server) = serve_once("400 Bad Request", body.to_string()).await;

        let err = transformer(&endpoint)
            .transform(&portrait())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Request blocked by safety settings");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_transform_service_error() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        let (endpoint, server) = serve_once("429 Too Many Requests", body.to_string()).await;

        let err = transformer(&endpoint)
            .transform(&portrait())
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Api { status: 429, .. }));
        assert_eq!(err.user_message(), "Resource has been exhausted");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_transform_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transformer(&format!("http://{addr}/v1beta"))
            .transform(&portrait())
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Network(_)));
        assert!(!err.user_message().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_uses_model_path() {
        let (endpoint, server) = serve_once("200 OK", "{}".to_string()).await;
        let transformer = GeminiTransformer::new(
            StudioConfig::new()
                .with_api_key("test-key")
                .with_model(GeminiModel::NanoBananaPro)
                .with_endpoint(&endpoint),
        );

        transformer.health_check().await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v1beta/models/nano-banana-pro-preview "));
    }
}
