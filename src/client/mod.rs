pub mod error;
pub mod http;

pub use error::{ApiError, describe_error};
pub use http::HttpTransport;

#[cfg(test)]
use mockall::automock;

use crate::models::{
    Conversation, ConversationId, ConversationPage, Message, MessagePage, Page, StreamRequest,
};
use async_trait::async_trait;
use eyre::Result;
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::{pin::Pin, sync::Arc};

/// Raw response body of a streaming call, delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Response head of the streaming endpoint. The body is left unread so the
/// caller decides how to consume it.
pub struct StreamResponse {
    pub status: u16,
    /// Canonical reason phrase of `status`
    pub reason: String,
    pub body: Option<ByteStream>,
}

/// Request/response collaborator used by the conversation store.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Transport {
    async fn list_conversations(&self, page: Page) -> Result<ConversationPage>;
    async fn create_conversation(&self, title: String) -> Result<Conversation>;
    async fn delete_conversation(&self, id: ConversationId) -> Result<()>;
    async fn list_messages(&self, id: ConversationId, page: Page) -> Result<MessagePage>;
    async fn post_message(&self, id: ConversationId, request: StreamRequest) -> Result<Message>;
    /// Open the event stream for a new message. Fails only when no response
    /// could be obtained at all.
    async fn open_stream(
        &self,
        id: ConversationId,
        request: StreamRequest,
    ) -> Result<StreamResponse>;
}

pub type ArcTransport = Arc<dyn Transport + Send + Sync>;

impl StreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Pull a human readable message out of an error body. `detail` is used
/// verbatim when it is a string, structured details are rendered as JSON.
pub(crate) fn extract_detail(body: &[u8]) -> Option<String> {
    let resp = serde_json::from_slice::<ErrorResponse>(body).ok()?;
    match resp.detail {
        Some(Value::String(detail)) => Some(detail),
        Some(Value::Null) | None => resp.message,
        Some(detail) => Some(detail.to_string()),
    }
}
