pub mod gemini;

use async_trait::async_trait;
use futures::{ Stream, StreamExt, Future };
use serde::Serialize;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use log::debug;

use super::{ GenerationRequest, LlmError };

pub use self::gemini::GeminiChatClient;

/// Ordered text fragments from one generation call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn stream_chat(&self, request: GenerationRequest) -> Result<TextStream, LlmError>;

    fn get_model(&self) -> String;
}

pub fn create_streaming_response<F, Fut>(response_fn: F) -> TextStream
    where
        F: FnOnce(mpsc::Sender<Result<String, LlmError>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Splits the next complete `\n`-terminated line off the front of `buf`.
pub(crate) fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|b| *b == b'\n')?;
    let line: Vec<u8> = buf.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_string())
}

/// POSTs `payload` and feeds every line of the response body through `line_parser`,
/// forwarding the tokens it yields in order. Lines may span network chunks.
pub fn http_stream_generate(
    client: reqwest::Client,
    url: String,
    payload: impl Serialize + Send + 'static,
    line_parser: fn(&str) -> Result<Option<String>, LlmError>,
    headers: Vec<(String, String)>
) -> TextStream {
    create_streaming_response(move |tx| async move {
        let mut req = client.post(&url).json(&payload);
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let _ = tx.send(Err(LlmError::Http(e))).await;
                return;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let _ = tx.send(Err(LlmError::Status { status: status.as_u16(), body })).await;
            return;
        }

        let mut bytes = resp.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(buf) => {
                    pending.extend_from_slice(&buf);
                    while let Some(line) = take_line(&mut pending) {
                        if !forward_line(&tx, line_parser, &line).await {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(LlmError::Http(e))).await;
                    return;
                }
            }
        }

        if !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).trim_end().to_string();
            forward_line(&tx, line_parser, &line).await;
        }
        debug!("Upstream stream from {} finished", url);
    })
}

// Returns false once nothing more should be sent.
async fn forward_line(
    tx: &mpsc::Sender<Result<String, LlmError>>,
    line_parser: fn(&str) -> Result<Option<String>, LlmError>,
    line: &str
) -> bool {
    match line_parser(line) {
        Ok(Some(token)) => tx.send(Ok(token)).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}
