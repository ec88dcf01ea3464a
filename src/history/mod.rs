use crate::llm::{ Content, Role };
use crate::models::chat::{ HistoryEntry, Message };

/// Replays client-supplied history as model turns. Blank entries are dropped,
/// order is kept.
pub fn build_conversation(history: &[HistoryEntry]) -> Vec<Content> {
    history
        .iter()
        .filter(|entry| !entry.text.trim().is_empty())
        .map(|entry| Content::text(Role::from(entry.sender), entry.text.clone()))
        .collect()
}

/// Conversation for one relay call: the replayed history followed by the new user turn.
pub fn conversation_with_message(history: &[HistoryEntry], message: &str) -> Vec<Content> {
    let mut contents = build_conversation(history);
    contents.push(Content::text(Role::User, message));
    contents
}

/// Projects a session's message log to the wire history, skipping failed and
/// in-flight messages.
pub fn normalize_history(messages: &[Message]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .filter(|msg| !msg.is_error && !msg.is_streaming)
        .map(Message::to_history_entry)
        .collect()
}
