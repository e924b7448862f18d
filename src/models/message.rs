#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConversationId;

/// Identifier of a message in a conversation.
///
/// Server payloads always carry `Confirmed` ids. `Provisional` ids are minted
/// locally for optimistic messages and live in their own variant, so they can
/// never compare equal to a server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "u64")]
pub enum MessageId {
    Provisional(u64),
    Confirmed(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    content: String,
    role: Role,
    #[serde(rename = "create_time", deserialize_with = "super::timestamp::deserialize")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub total: usize,
}

impl MessageId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, MessageId::Provisional(_))
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        MessageId::Confirmed(value)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageId::Provisional(id) => write!(f, "provisional-{}", id),
            MessageId::Confirmed(id) => write!(f, "{}", id),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            content: content.into(),
            role,
            created_at: Utc::now(),
        }
    }

    /// An optimistic user message, shown before the server confirms it.
    pub fn provisional(
        seq: u64,
        conversation_id: ConversationId,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            MessageId::Provisional(seq),
            conversation_id,
            Role::User,
            content,
        )
    }

    pub fn with_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_at = timestamp;
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
