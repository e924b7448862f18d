use chrono::{DateTime, Utc};
use serde::Deserialize;

pub type ConversationId = u64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    user_id: u64,
    title: String,
    #[serde(rename = "create_time", deserialize_with = "super::timestamp::deserialize")]
    created_at: DateTime<Utc>,
    #[serde(rename = "update_time", deserialize_with = "super::timestamp::deserialize")]
    updated_at: DateTime<Utc>,
}

/// One page of conversations together with the server side total.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub total: usize,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: 0,
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_user_id(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_at = timestamp;
        self
    }

    pub fn with_updated_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.updated_at = timestamp;
        self
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
