use std::collections::HashMap;

use crate::models::{Conversation, ConversationId, Message};

/// Send state of one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Optimistic message inserted, stream open
    Sending,
    /// Optimistic message inserted, waiting for a non-streamed reply
    Posting,
    /// Stream finished, authoritative message list being fetched
    Refreshing,
}

/// Assistant text received so far for the in-flight reply of the active
/// conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingBuffer {
    conversation_id: Option<ConversationId>,
    content: String,
    open: bool,
}

/// Snapshot of everything the UI renders.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) conversations: Vec<Conversation>,
    pub(crate) total: usize,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,

    pub(crate) active: Option<ConversationId>,
    pub(crate) messages: Vec<Message>,
    pub(crate) messages_total: usize,
    pub(crate) messages_loading: bool,
    pub(crate) messages_error: Option<String>,
    /// Bumped by every selection and fetch; only the latest fetch applies
    pub(crate) messages_generation: u64,

    pub(crate) streaming: StreamingBuffer,
    pub(crate) phases: HashMap<ConversationId, Phase>,
}

impl StreamingBuffer {
    pub(crate) fn open_for(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            content: String::new(),
            open: true,
        }
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether chunks are still arriving
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn belongs_to(&self, conversation_id: ConversationId) -> bool {
        self.conversation_id == Some(conversation_id)
    }

    pub(crate) fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
    }
}

impl StoreState {
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn active(&self) -> Option<ConversationId> {
        self.active
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_total(&self) -> usize {
        self.messages_total
    }

    pub fn is_messages_loading(&self) -> bool {
        self.messages_loading
    }

    pub fn messages_error(&self) -> Option<&str> {
        self.messages_error.as_deref()
    }

    pub fn streaming(&self) -> &StreamingBuffer {
        &self.streaming
    }

    /// True while a stream for the active conversation is open.
    pub fn is_streaming(&self) -> bool {
        self.streaming.open
    }

    pub fn phase(&self, conversation_id: ConversationId) -> Phase {
        self.phases
            .get(&conversation_id)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn set_phase(&mut self, conversation_id: ConversationId, phase: Phase) {
        if phase == Phase::Idle {
            self.phases.remove(&conversation_id);
        } else {
            self.phases.insert(conversation_id, phase);
        }
    }

    pub(crate) fn is_active(&self, conversation_id: ConversationId) -> bool {
        self.active == Some(conversation_id)
    }

    /// Reset the streaming buffer if it belongs to `conversation_id`.
    pub(crate) fn clear_streaming(&mut self, conversation_id: ConversationId) {
        if self.streaming.belongs_to(conversation_id) {
            self.streaming = StreamingBuffer::default();
        }
    }
}
