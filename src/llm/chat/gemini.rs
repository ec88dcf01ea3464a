use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use log::info;

use super::{ ChatClient, TextStream, http_stream_generate };
use crate::llm::{
    Content,
    GenerationRequest,
    LlmConfig,
    LlmError,
    Part,
    DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamRequest {
    contents: Vec<Content>,
    system_instruction: GeminiSystemInstruction,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GoogleChunk {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    error: Option<GoogleError>,
}

/// Error object Gemini writes into the event stream once the 200 head is out.
#[derive(Deserialize)]
struct GoogleError {
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

/// Parses one line of a `streamGenerateContent?alt=sse` response.
fn parse_gemini_sse_line(line: &str) -> Result<Option<String>, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    let chunk: GoogleChunk = serde_json::from_str(data)?;
    if let Some(err) = chunk.error {
        return Err(LlmError::Status {
            status: err.code.unwrap_or(500),
            body: format!("{}: {}", err.status, err.message),
        });
    }
    let text: String = chunk.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

fn build_payload(request: GenerationRequest) -> GeminiStreamRequest {
    GeminiStreamRequest {
        contents: request.contents,
        system_instruction: GeminiSystemInstruction {
            parts: vec![Part { text: request.system_instruction }],
        },
        generation_config: GeminiGenerationConfig {
            temperature: request.temperature,
        },
    }
}

pub struct GeminiChatClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("Google API key is required for GeminiChatClient".into()));
        }
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config("Google API key is required for GeminiChatClient".into()))?;
        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn stream_url(&self) -> String {
        format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn stream_chat(&self, request: GenerationRequest) -> Result<TextStream, LlmError> {
        info!(
            "GeminiChatClient::stream_chat() → model={} turns={} temperature={}",
            self.model,
            request.contents.len(),
            request.temperature
        );

        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("x-goog-api-key".to_string(), self.api_key.clone())
        ];

        Ok(
            http_stream_generate(
                self.http.clone(),
                self.stream_url(),
                build_payload(request),
                parse_gemini_sse_line,
                headers
            )
        )
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use serde_json::json;

    #[test]
    fn parses_text_from_data_line() {
        let line =
            r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        assert_eq!(parse_gemini_sse_line(line).unwrap().as_deref(), Some("Hello"));
    }

    #[test]
    fn ignores_non_data_and_empty_lines() {
        assert_eq!(parse_gemini_sse_line("").unwrap(), None);
        assert_eq!(parse_gemini_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_gemini_sse_line("data: ").unwrap(), None);
    }

    #[test]
    fn chunk_without_text_yields_nothing() {
        let line = r#"data: {"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":5}}"#;
        assert_eq!(parse_gemini_sse_line(line).unwrap(), None);
    }

    #[test]
    fn malformed_data_line_is_a_decode_error() {
        assert!(matches!(parse_gemini_sse_line("data: {oops"), Err(LlmError::Decode(_))));
    }

    #[test]
    fn error_payload_is_a_status_error() {
        let line =
            r#"data: {"error":{"code":503,"message":"The model is overloaded","status":"UNAVAILABLE"}}"#;
        match parse_gemini_sse_line(line) {
            Err(LlmError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "UNAVAILABLE: The model is overloaded");
            }
            other => panic!("expected a status error, got {:?}", other),
        }

        let bare = r#"data: {"error":{"message":"quota"}}"#;
        assert!(matches!(parse_gemini_sse_line(bare), Err(LlmError::Status { status: 500, .. })));
    }

    #[test]
    fn payload_carries_system_instruction_and_temperature() {
        let payload = build_payload(GenerationRequest {
            system_instruction: "be nice".into(),
            contents: vec![Content::text(Role::User, "hi")],
            temperature: 0.7,
        });
        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(value["contents"], json!([{ "role": "user", "parts": [{ "text": "hi" }] }]));
        assert_eq!(value["systemInstruction"], json!({ "parts": [{ "text": "be nice" }] }));
        let temperature = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn client_requires_api_key_and_fills_defaults() {
        assert!(matches!(GeminiChatClient::from_config(&LlmConfig::default()), Err(LlmError::Config(_))));

        let client = GeminiChatClient::new(
            "key".into(),
            None,
            Some("http://localhost:9000/v1beta/".into())
        ).unwrap();
        assert_eq!(client.get_model(), DEFAULT_GEMINI_MODEL);
        assert_eq!(
            client.stream_url(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }
}
