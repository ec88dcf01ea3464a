use std::path::Path;
use std::sync::Arc;
use axum::{
    body::{ Body, Bytes },
    extract::State,
    http::header,
    response::{ IntoResponse, Response },
    routing::post,
    Router,
};
use futures::{ future, stream, StreamExt };
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::{ ServeDir, ServeFile };
use log::{ info, error };

use super::error::RelayError;
use crate::config::prompt::TEMPERATURE;
use crate::history::conversation_with_message;
use crate::llm::chat::ChatClient;
use crate::llm::{ GenerationRequest, LlmError };
use crate::models::chat::ChatRequest;

pub const CHAT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub chat_client: Arc<dyn ChatClient>,
    pub system_instruction: Arc<str>,
}

impl AppState {
    pub fn new(chat_client: Arc<dyn ChatClient>, system_instruction: Arc<str>) -> Self {
        Self { chat_client, system_instruction }
    }
}

/// `/api/chat` plus the static front-end, with unknown paths falling back to
/// `index.html` so client-side routes resolve.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(static_dir)
        .fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .fallback_service(assets)
        .with_state(state)
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let request: ChatRequest = serde_json::from_slice(&body)?;
    if request.message.trim().is_empty() {
        return Err(RelayError::EmptyMessage);
    }

    let contents = conversation_with_message(&request.history, &request.message);
    info!(
        "POST /api/chat: {} history entries, {} turns forwarded to {}",
        request.history.len(),
        contents.len(),
        state.chat_client.get_model()
    );

    let generation = GenerationRequest {
        system_instruction: state.system_instruction.to_string(),
        contents,
        temperature: TEMPERATURE,
    };
    let mut upstream = state.chat_client.stream_chat(generation).await?;

    // Hold the response head until the first fragment arrives, so an upstream
    // that fails before producing text still maps to a 500.
    let first = loop {
        match upstream.next().await {
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => break Some(text),
            Some(Err(e)) => return Err(e.into()),
            None => break None,
        }
    };

    let fragments = stream
        ::iter(first.map(Ok::<String, LlmError>))
        .chain(upstream.filter(|item| future::ready(!matches!(item, Ok(text) if text.is_empty()))))
        .map(|item| {
            if let Err(e) = &item {
                error!("Upstream stream failed mid-response in /api/chat: {}", e);
            }
            item.map(Bytes::from)
        });

    Ok(([(header::CONTENT_TYPE, CHAT_CONTENT_TYPE)], Body::from_stream(fragments)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::TextStream;
    use crate::llm::{ Content, Role };
    use crate::models::chat::ErrorBody;
    use async_trait::async_trait;
    use axum::http::{ Request, StatusCode };
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct ScriptedClient {
        items: Vec<Result<String, u16>>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedClient {
        fn new(items: Vec<Result<&str, u16>>) -> Arc<Self> {
            Arc::new(Self {
                items: items
                    .into_iter()
                    .map(|i| i.map(str::to_string))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn stream_chat(&self, request: GenerationRequest) -> Result<TextStream, LlmError> {
            self.seen.lock().unwrap().push(request);
            let items: Vec<Result<String, LlmError>> = self.items
                .iter()
                .cloned()
                .map(|i| i.map_err(|status| LlmError::Status { status, body: "boom".into() }))
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }

        fn get_model(&self) -> String {
            "scripted".into()
        }
    }

    fn app(client: Arc<ScriptedClient>) -> Router {
        let state = AppState::new(client, Arc::from("system rules"));
        router(state, Path::new("does-not-exist"))
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn streams_fragments_in_order_as_plain_text() {
        let client = ScriptedClient::new(vec![Ok("Hel"), Ok(""), Ok("lo "), Ok("ဟယ်")]);
        let response = app(client.clone())
            .oneshot(chat_request(r#"{"message":"hi","history":[]}"#)).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], CHAT_CONTENT_TYPE);
        assert_eq!(body_text(response).await, "Hello ဟယ်");
    }

    #[tokio::test]
    async fn forwards_filtered_history_with_fixed_prompt_and_temperature() {
        let client = ScriptedClient::new(vec![Ok("ok")]);
        let body =
            r#"{"message":"next","history":[
                {"text":"welcome","sender":"bot"},
                {"text":"  ","sender":"user"},
                {"text":"first","sender":"user"}
            ]}"#;
        let response = app(client.clone()).oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(&*seen[0].system_instruction, "system rules");
        assert!((seen[0].temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(
            seen[0].contents,
            vec![
                Content::text(Role::Model, "welcome"),
                Content::text(Role::User, "first"),
                Content::text(Role::User, "next")
            ]
        );
    }

    #[tokio::test]
    async fn upstream_failure_before_text_is_opaque_500() {
        let client = ScriptedClient::new(vec![Ok(""), Err(503)]);
        let response = app(client)
            .oneshot(chat_request(r#"{"message":"hi","history":[]}"#)).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.error, "Internal Server Error");
    }

    #[tokio::test]
    async fn malformed_or_empty_requests_are_500() {
        for body in [
            "not json",
            r#"{"history":[]}"#,
            r#"{"message":"hi"}"#,
            r#"{"message":"hi","history":null}"#,
            r#"{"message":"   ","history":[]}"#,
            r#"{"message":"hi","history":[{"text":"x","sender":"robot"}]}"#,
        ] {
            let client = ScriptedClient::new(vec![Ok("never")]);
            let response = app(client.clone()).oneshot(chat_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "body: {}", body);
            assert!(client.seen.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_flushed_text_then_errors() {
        let client = ScriptedClient::new(vec![Ok("partial "), Ok("text"), Err(500)]);
        let response = app(client)
            .oneshot(chat_request(r#"{"message":"hi","history":[]}"#)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        let mut received = String::new();
        let mut failed = false;
        while let Some(frame) = body.next().await {
            match frame {
                Ok(bytes) => received.push_str(std::str::from_utf8(&bytes).unwrap()),
                Err(_) => {
                    failed = true;
                    break;
                }
            }
        }
        assert_eq!(received, "partial text");
        assert!(failed);
    }

    #[tokio::test]
    async fn empty_upstream_is_an_empty_200() {
        let client = ScriptedClient::new(vec![]);
        let response = app(client)
            .oneshot(chat_request(r#"{"message":"hi","history":[]}"#)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }
}
