use uuid::Uuid;
use log::{ info, warn };

use super::{ ClientError, RelayClient };
use crate::history::normalize_history;
use crate::models::chat::{ HistoryEntry, Message, Sender };

pub const WELCOME_TEXT: &str =
    "Hello! I am your bilingual assistant. I can speak English and Mon. How can I help you today?\n\nမင်္ဂလာပါ! အဲကျွန် ဂွံရီုဗင် ဘာသာမန် ကဵု အင်္ဂလိက် ၜါဘာသာရ။ မုဂွံရီုဗင်ကဵုရော?";

pub const CLEARED_TEXT: &str =
    "Conversation cleared. I'm ready to help in English or Mon.\n\nတက်ကျာဂှ် ပလီုထောံယျ။ အဲဂွံရီုဗင် ပ္ဍဲဘာသာအင်္ဂလိက် ကဵု မန် ရ။";

pub const ERROR_TEXT: &str =
    "Sorry, I encountered an error while connecting to the server. Please ensure the server is running and try again.\n\nဂွံအာလောတ်ရ၊ ဒုင်ဂုဏ်ရ။ ဆက်ဆောံကဵုအဲမွဲဝါပၠန်ညိ။";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Pending,
    Streaming,
    Complete,
    Failed,
}

impl TurnState {
    pub fn of(message: &Message) -> Self {
        if message.is_error {
            TurnState::Failed
        } else if !message.is_streaming {
            TurnState::Complete
        } else if message.text.is_empty() {
            TurnState::Pending
        } else {
            TurnState::Streaming
        }
    }
}

/// What the transport needs for one send. `history` is captured before the new
/// user message and the placeholder were appended.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    pub reply_id: Uuid,
}

/// Client-held conversation. Owns every message; the relay never sees more than
/// the history handed to it per send.
#[derive(Debug)]
pub struct ChatSession {
    messages: Vec<Message>,
    disabled: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::new(WELCOME_TEXT, Sender::Bot)],
            disabled: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// True while a reply is in flight; sends are refused until it settles.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn begin_send(&mut self, text: &str) -> Result<PendingTurn, ClientError> {
        if self.disabled {
            return Err(ClientError::Busy);
        }
        if text.trim().is_empty() {
            return Err(ClientError::EmptyInput);
        }

        let history = normalize_history(&self.messages);
        let placeholder = Message::placeholder();
        let reply_id = placeholder.id;

        self.messages.push(Message::new(text, Sender::User));
        self.messages.push(placeholder);
        self.disabled = true;

        Ok(PendingTurn {
            message: text.to_string(),
            history,
            reply_id,
        })
    }

    pub fn apply_update(&mut self, id: Uuid, text: &str) -> Option<&Message> {
        apply_to(&mut self.messages, id, text).map(|m| &*m)
    }

    pub fn complete(&mut self, id: Uuid) {
        if let Some(msg) = find_mut(&mut self.messages, id) {
            msg.is_streaming = false;
        }
        self.disabled = false;
    }

    /// Any partial reply is replaced by the bilingual apology.
    pub fn fail(&mut self, id: Uuid) {
        if let Some(msg) = find_mut(&mut self.messages, id) {
            msg.text = ERROR_TEXT.to_string();
            msg.is_error = true;
            msg.is_streaming = false;
        }
        self.disabled = false;
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::new(CLEARED_TEXT, Sender::Bot));
        self.disabled = false;
    }

    /// Runs one full turn against the relay. `on_render` sees the reply message
    /// every time its text changes. Transport failures end in a failed message
    /// rather than an error; only a refused send returns `Err`.
    pub async fn send<F>(
        &mut self,
        relay: &RelayClient,
        text: &str,
        mut on_render: F
    ) -> Result<Message, ClientError>
        where F: FnMut(&Message)
    {
        let turn = self.begin_send(text)?;
        let id = turn.reply_id;

        let result = {
            let messages = &mut self.messages;
            relay.stream_chat(&turn.message, &turn.history, |full_text| {
                if let Some(msg) = apply_to(messages, id, full_text) {
                    on_render(msg);
                }
            }).await
        };

        match result {
            Ok(full_text) => {
                info!("Reply {} completed ({} bytes)", id, full_text.len());
                self.complete(id);
            }
            Err(e) => {
                warn!("Failed to send message: {}", e);
                self.fail(id);
            }
        }

        let reply = self.message(id).cloned().unwrap_or_else(Message::placeholder);
        Ok(reply)
    }
}

fn find_mut(messages: &mut [Message], id: Uuid) -> Option<&mut Message> {
    messages.iter_mut().find(|m| m.id == id)
}

fn apply_to<'a>(messages: &'a mut [Message], id: Uuid, text: &str) -> Option<&'a mut Message> {
    let msg = find_mut(messages, id)?;
    msg.text = text.to_string();
    Some(msg)
}
