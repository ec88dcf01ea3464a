pub mod session;
pub mod stream;

use thiserror::Error;
use url::Url;
use log::{ debug, warn };

use crate::models::chat::{ ChatRequest, ErrorBody, HistoryEntry };
use self::stream::consume_stream;

pub use self::session::{ ChatSession, PendingTurn, TurnState };

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request to relay failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay returned status {status}: {message}")]
    Status {
        status: u16,
        message: String,
    },

    #[error("a reply is still streaming")]
    Busy,

    #[error("message is empty")]
    EmptyInput,
}

/// HTTP side of the chat front-end: posts one turn to `/api/chat` and reads the
/// streamed reply.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(base_url)?.join("/api/chat")?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn stream_chat<F>(
        &self,
        message: &str,
        history: &[HistoryEntry],
        on_update: F
    ) -> Result<String, ClientError>
        where F: FnMut(&str)
    {
        let request = ChatRequest {
            message: message.to_string(),
            history: history.to_vec(),
        };
        debug!("POST {} with {} history entries", self.endpoint, request.history.len());

        let resp = self.http.post(self.endpoint.clone()).json(&request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json
                ::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!("Relay answered {}: {}", status, message);
            return Err(ClientError::Status { status: status.as_u16(), message });
        }

        Ok(consume_stream(resp.bytes_stream(), on_update).await?)
    }
}
