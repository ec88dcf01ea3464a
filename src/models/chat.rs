use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Wire form of a past turn, as replayed into the model prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub sender: Sender,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self { text: text.into(), sender }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A message as held by a chat session. Only the session mutates it.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub is_streaming: bool,
    pub is_error: bool,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            is_streaming: false,
            is_error: false,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            is_streaming: true,
            ..Self::new(String::new(), Sender::Bot)
        }
    }

    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry::new(self.text.clone(), self.sender)
    }
}
