#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::pin::pin;

use eyre::Result;
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::client::{ArcTransport, ByteStream, describe_error, extract_detail};
use crate::models::{ConversationId, SendOptions, StreamEvent, StreamRequest};

use super::decode_stream;

pub const NO_RESPONSE_BODY: &str = "no response body";
pub const STREAM_ENDED: &str = "stream ended unexpectedly";

/// Receiver of the events of one stream session.
pub trait StreamObserver: Send {
    fn on_event(&mut self, event: StreamEvent);
}

impl<F> StreamObserver for F
where
    F: FnMut(StreamEvent) + Send,
{
    fn on_event(&mut self, event: StreamEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server sent `done`
    Completed,
    /// The server refused the exchange before streaming began. An error
    /// event was delivered to the observer.
    Rejected,
    /// An error event was delivered to the observer after the stream opened
    Failed,
    /// The cancellation token fired after the server accepted the
    /// message. Nothing was delivered afterwards.
    Cancelled,
    /// The cancellation token fired before the server accepted the message.
    /// The observer saw nothing.
    CancelledBeforeOpen,
}

/// One streaming exchange for a single message. A session is used once and
/// never retries.
pub struct StreamSession {
    transport: ArcTransport,
    conversation_id: ConversationId,
    request: StreamRequest,
}

impl StreamSession {
    pub fn new(
        transport: ArcTransport,
        conversation_id: ConversationId,
        content: impl Into<String>,
        options: SendOptions,
    ) -> Self {
        Self {
            transport,
            conversation_id,
            request: StreamRequest::new(content, options),
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Run the exchange, delivering events to `observer` in arrival order.
    ///
    /// Returns `Err` only when the stream could not be opened at all, in
    /// which case the observer saw nothing. Otherwise the observer receives
    /// zero or more chunks followed by exactly one terminal event, unless
    /// the session is cancelled first.
    pub async fn run<O>(self, observer: &mut O, cancel: &CancellationToken) -> Result<SessionOutcome>
    where
        O: StreamObserver + ?Sized,
    {
        let id = self.conversation_id;
        log::debug!("Starting stream session for conversation {}", id);

        if cancel.is_cancelled() {
            log::debug!("Stream session for conversation {} cancelled before open", id);
            return Ok(SessionOutcome::CancelledBeforeOpen);
        }

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Stream session for conversation {} cancelled while opening", id);
                return Ok(SessionOutcome::CancelledBeforeOpen);
            }
            res = self.transport.open_stream(id, self.request) => res?,
        };

        if !res.is_success() {
            let detail = match res.body {
                Some(body) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(SessionOutcome::CancelledBeforeOpen),
                        body = read_body(body) => body.as_deref().and_then(extract_detail),
                    }
                }
                None => None,
            };
            let detail = detail.unwrap_or_else(|| fallback_detail(res.status, &res.reason));
            log::warn!(
                "Stream for conversation {} rejected with status {}: {}",
                id,
                res.status,
                detail
            );
            observer.on_event(StreamEvent::error(detail));
            return Ok(SessionOutcome::Rejected);
        }

        let Some(body) = res.body else {
            log::warn!("Stream for conversation {} has no body", id);
            observer.on_event(StreamEvent::error(NO_RESPONSE_BODY));
            return Ok(SessionOutcome::Failed);
        };

        // The body lives in this scope and is dropped on every return below
        let mut events = pin!(decode_stream(body));
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("Stream session for conversation {} cancelled", id);
                    return Ok(SessionOutcome::Cancelled);
                }
                next = events.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    log::warn!("Reading stream for conversation {} failed: {:?}", id, err);
                    observer.on_event(StreamEvent::error(describe_error(&err)));
                    return Ok(SessionOutcome::Failed);
                }
                None => {
                    log::warn!("Stream for conversation {} ended without terminal event", id);
                    observer.on_event(StreamEvent::error(STREAM_ENDED));
                    return Ok(SessionOutcome::Failed);
                }
            };

            log::trace!("Stream event for conversation {}: {:?}", id, event);
            let outcome = match &event {
                StreamEvent::Chunk { .. } => None,
                StreamEvent::Done => Some(SessionOutcome::Completed),
                StreamEvent::Error { .. } => Some(SessionOutcome::Failed),
            };
            observer.on_event(event);
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }
    }
}

async fn read_body(body: ByteStream) -> Option<Vec<u8>> {
    body.try_concat()
        .await
        .inspect_err(|err| log::debug!("Reading error body failed: {}", err))
        .ok()
}

fn fallback_detail(status: u16, reason: &str) -> String {
    if reason.is_empty() {
        format!("request failed with status {}", status)
    } else {
        reason.to_string()
    }
}
