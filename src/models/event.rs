use serde::Deserialize;

/// A protocol event decoded from one `data: ` line of the message stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental assistant text
    Chunk { content: String },
    Done,
    Error { detail: String },
}

impl StreamEvent {
    pub fn chunk(content: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        StreamEvent::Error {
            detail: detail.into(),
        }
    }

    /// `Done` and `Error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}
