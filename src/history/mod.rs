use log::warn;
use serde_json::Value;

use crate::error::{ ChatError, Result };
use crate::models::chat::{ Message, Role };

/// Label fragments that mark a legacy `(label, text)` pair as spoken by the user.
const USER_MARKERS: &[&str] = &["user", "you", "human", "me", "🧍", "👤", "🙋"];

/// Ordered transcript of one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: Vec<Message>) -> Self {
        Self { messages: seed }
    }

    /// Builds a store from loosely typed entries, see [`ConversationStore::sanitize`].
    pub fn from_legacy(entries: &[Value]) -> Self {
        Self::with_seed(Self::sanitize(entries))
    }

    pub fn append(&mut self, role: &str, content: &str) -> Result<()> {
        let role: Role = role.parse()?;
        self.push(Message::new(role, content))
    }

    pub fn push(&mut self, message: Message) -> Result<()> {
        if message.content.trim().is_empty() {
            return Err(ChatError::validation(format!("{} message has no content", message.role)));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops the whole transcript, restoring `seed` verbatim when given.
    pub fn clear(&mut self, seed: Option<&[Message]>) {
        self.messages = seed.map(|s| s.to_vec()).unwrap_or_default();
    }

    /// Coerces entries from an external or legacy history into messages.
    ///
    /// Accepted shapes:
    /// - a bare string, read as a user message
    /// - a `[label, text]` pair, user when the label carries a user marker, assistant otherwise
    /// - a `{role, content}` object
    ///
    /// Anything else that still carries text is kept as a user message and logged
    /// for review. Entries without usable text are dropped. Never fails.
    pub fn sanitize(entries: &[Value]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            match coerce_entry(entry) {
                Coerced::Clean(message) => messages.push(message),
                Coerced::Ambiguous(message) => {
                    warn!("History entry {} has an unrecognized shape, kept as user message: {}", index, entry);
                    messages.push(message);
                }
                Coerced::Dropped => {
                    warn!("History entry {} has no usable text, dropped: {}", index, entry);
                }
            }
        }

        messages
    }
}

enum Coerced {
    Clean(Message),
    Ambiguous(Message),
    Dropped,
}

fn non_empty(text: &str) -> Option<&str> {
    if text.trim().is_empty() { None } else { Some(text) }
}

fn role_for_label(label: &str) -> Role {
    let label = label.to_lowercase();
    let is_user = USER_MARKERS.iter().any(|marker| {
        if marker.is_ascii() {
            label
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == *marker)
        } else {
            label.contains(marker)
        }
    });
    if is_user { Role::User } else { Role::Assistant }
}

fn coerce_entry(entry: &Value) -> Coerced {
    match entry {
        Value::String(text) => match non_empty(text) {
            Some(text) => Coerced::Clean(Message::user(text)),
            None => Coerced::Dropped,
        },
        Value::Array(items) => match items.as_slice() {
            [Value::String(label), Value::String(text)] => match non_empty(text) {
                Some(text) if label.trim().is_empty() => Coerced::Ambiguous(Message::user(text)),
                Some(text) => Coerced::Clean(Message::new(role_for_label(label), text)),
                None => Coerced::Dropped,
            },
            _ => ambiguous_text(entry),
        },
        Value::Object(map) => {
            let content = map.get("content").and_then(Value::as_str).and_then(non_empty);
            let role = map.get("role").and_then(Value::as_str);
            match (role, content) {
                (Some(role), Some(text)) => match role.parse::<Role>() {
                    Ok(role) => Coerced::Clean(Message::new(role, text)),
                    Err(_) => Coerced::Ambiguous(Message::user(text)),
                },
                (None, Some(text)) => Coerced::Ambiguous(Message::user(text)),
                (_, None) => Coerced::Dropped,
            }
        }
        Value::Null => Coerced::Dropped,
        Value::Bool(_) | Value::Number(_) => ambiguous_text(entry),
    }
}

fn ambiguous_text(entry: &Value) -> Coerced {
    let text = match entry {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };
    match non_empty(&text) {
        Some(text) => Coerced::Ambiguous(Message::user(text)),
        None => Coerced::Dropped,
    }
}
