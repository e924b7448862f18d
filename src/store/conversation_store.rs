#[cfg(test)]
#[path = "conversation_store_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::{ArcTransport, describe_error};
use crate::config::PagingConfig;
use crate::models::{
    Conversation, ConversationId, Message, MessageId, Page, SendOptions, StreamEvent,
    StreamRequest,
};
use crate::stream::{SessionOutcome, StreamSession};

use super::{Phase, StoreState, StreamingBuffer};

/// How a `send_message` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply finished and the message list was reconciled
    Completed,
    /// The server reported an error while streaming, the user message stays
    Failed,
    /// Nothing reached the server, the optimistic message was removed
    RolledBack,
    /// Stopped by the caller. The user message stays only if the server had
    /// already accepted it.
    Cancelled,
    /// Another send for the same conversation is still in flight
    Rejected,
}

/// Owner of conversation and message state.
///
/// Cloning is cheap and every clone shares the same state. All mutations go
/// through the methods below, readers take snapshots or subscribe to
/// changes. Failures are recorded in the state instead of being returned.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Inner>,
}

struct Inner {
    transport: ArcTransport,
    paging: PagingConfig,
    state: watch::Sender<StoreState>,
    next_provisional: AtomicU64,
}

impl ConversationStore {
    pub fn new(transport: ArcTransport) -> Self {
        Self::with_paging(transport, PagingConfig::default())
    }

    pub fn with_paging(transport: ArcTransport, paging: PagingConfig) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                paging,
                state,
                next_provisional: AtomicU64::new(1),
            }),
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.update(|state| state.error = None);
    }

    pub fn clear_messages_error(&self) {
        self.update(|state| state.messages_error = None);
    }

    pub async fn list_conversations(&self) {
        let page = Page::first(self.inner.paging.conversations_limit);
        self.list_conversations_page(page).await
    }

    pub async fn list_conversations_page(&self, page: Page) {
        self.update(|state| {
            state.loading = true;
            state.error = None;
        });

        match self.inner.transport.list_conversations(page).await {
            Ok(page) => self.update(|state| {
                state.conversations = page.conversations;
                state.total = page.total;
                state.loading = false;
            }),
            Err(err) => {
                log::error!("Failed to list conversations: {:?}", err);
                self.update(|state| {
                    state.error = Some(describe_error(&err));
                    state.loading = false;
                });
            }
        }
    }

    /// Create a conversation and put it at the top of the list.
    pub async fn create_conversation(&self, title: impl Into<String>) -> Option<Conversation> {
        match self.inner.transport.create_conversation(title.into()).await {
            Ok(convo) => {
                let created = convo.clone();
                self.update(|state| {
                    state.conversations.retain(|c| c.id() != convo.id());
                    state.conversations.insert(0, convo);
                    state.total += 1;
                });
                Some(created)
            }
            Err(err) => {
                log::error!("Failed to create conversation: {:?}", err);
                self.update(|state| state.error = Some(describe_error(&err)));
                None
            }
        }
    }

    /// Make `id` the active conversation and load its messages.
    ///
    /// Streams of the previously active conversation keep running; their
    /// output is no longer shown.
    pub async fn select_conversation(&self, id: Option<ConversationId>) {
        self.update(|state| {
            state.active = id;
            state.messages_generation += 1;
            state.messages.clear();
            state.messages_total = 0;
            state.messages_loading = false;
            state.messages_error = None;
            state.streaming = match id {
                Some(id) if state.phase(id) == Phase::Sending => StreamingBuffer::open_for(id),
                _ => StreamingBuffer::default(),
            };
        });

        if let Some(id) = id {
            self.fetch_messages(id).await;
        }
    }

    /// Delete a conversation. The local list only changes once the server
    /// confirmed the deletion.
    pub async fn delete_conversation(&self, id: ConversationId) -> bool {
        if let Err(err) = self.inner.transport.delete_conversation(id).await {
            log::error!("Failed to delete conversation {}: {:?}", id, err);
            self.update(|state| state.error = Some(describe_error(&err)));
            return false;
        }

        self.update(|state| {
            let before = state.conversations.len();
            state.conversations.retain(|c| c.id() != id);
            if state.conversations.len() < before {
                state.total = state.total.saturating_sub(1);
            }
            if state.is_active(id) {
                state.active = None;
                state.messages.clear();
                state.messages_total = 0;
                state.streaming = StreamingBuffer::default();
            }
        });
        true
    }

    pub async fn fetch_messages(&self, id: ConversationId) {
        let page = Page::first(self.inner.paging.messages_limit);
        self.fetch_messages_page(id, page).await
    }

    /// Replace the message list with the authoritative page for `id`.
    ///
    /// Only the latest fetch for the active conversation is applied, results
    /// overtaken by a newer selection or fetch are dropped.
    pub async fn fetch_messages_page(&self, id: ConversationId, page: Page) {
        let mut generation = None;
        self.update_if(|state| {
            if !state.is_active(id) {
                return false;
            }
            state.messages_generation += 1;
            generation = Some(state.messages_generation);
            state.messages_loading = true;
            state.messages_error = None;
            true
        });
        let Some(generation) = generation else {
            log::debug!("Not fetching messages of conversation {}, not active", id);
            return;
        };

        let result = self.inner.transport.list_messages(id, page).await;

        self.update_if(|state| {
            if !state.is_active(id) || state.messages_generation != generation {
                log::debug!("Dropping stale messages of conversation {}", id);
                return false;
            }
            match result {
                Ok(page) => {
                    state.messages = page.messages;
                    state.messages_total = page.total;
                }
                Err(err) => {
                    log::error!("Failed to fetch messages of conversation {}: {:?}", id, err);
                    state.messages_error = Some(describe_error(&err));
                }
            }
            state.messages_loading = false;
            true
        });
    }

    /// Send a message and stream the assistant reply into the streaming
    /// buffer.
    ///
    /// The user message shows up immediately with a provisional id. Once the
    /// reply is done the message list is fetched again so both messages
    /// carry server ids. If the request never reached the server the
    /// provisional message is removed again.
    pub async fn send_message(
        &self,
        id: ConversationId,
        content: impl Into<String>,
        options: SendOptions,
        cancel: &CancellationToken,
    ) -> SendOutcome {
        let content = content.into();
        let Some(provisional) = self.begin_send(id, &content, true) else {
            return SendOutcome::Rejected;
        };

        let session = StreamSession::new(self.inner.transport.clone(), id, content, options);
        let mut observer = |event: StreamEvent| self.apply_stream_event(id, event);
        let outcome = session.run(&mut observer, cancel).await;

        match outcome {
            Ok(SessionOutcome::Completed) => {
                self.reconcile(id).await;
                SendOutcome::Completed
            }
            Ok(SessionOutcome::Failed) => {
                self.update(|state| state.set_phase(id, Phase::Idle));
                SendOutcome::Failed
            }
            Ok(SessionOutcome::Rejected) => {
                // The observer already recorded the detail
                self.rollback(id, provisional, None);
                SendOutcome::RolledBack
            }
            Ok(SessionOutcome::CancelledBeforeOpen) => {
                log::debug!("Send to conversation {} cancelled before it was accepted", id);
                self.rollback(id, provisional, None);
                SendOutcome::Cancelled
            }
            Ok(SessionOutcome::Cancelled) => {
                log::debug!("Send to conversation {} cancelled", id);
                self.update(|state| {
                    state.clear_streaming(id);
                    state.set_phase(id, Phase::Idle);
                });
                SendOutcome::Cancelled
            }
            Err(err) => {
                log::error!("Failed to send message to conversation {}: {:?}", id, err);
                self.rollback(id, provisional, Some(describe_error(&err)));
                SendOutcome::RolledBack
            }
        }
    }

    /// Send a message without streaming. The reply is picked up by the
    /// refresh that follows.
    pub async fn post_message(
        &self,
        id: ConversationId,
        content: impl Into<String>,
        options: SendOptions,
    ) -> SendOutcome {
        let content = content.into();
        let Some(provisional) = self.begin_send(id, &content, false) else {
            return SendOutcome::Rejected;
        };

        let request = StreamRequest::new(content, options);
        match self.inner.transport.post_message(id, request).await {
            Ok(reply) => {
                log::debug!("Conversation {} got reply {}", id, reply.id());
                self.update(|state| state.set_phase(id, Phase::Refreshing));
                self.reconcile(id).await;
                SendOutcome::Completed
            }
            Err(err) => {
                log::error!("Failed to post message to conversation {}: {:?}", id, err);
                self.rollback(id, provisional, Some(describe_error(&err)));
                SendOutcome::RolledBack
            }
        }
    }

    /// Enter `Sending` for `id` and insert the optimistic user message. The
    /// streaming buffer is only opened when a reply will be streamed into it.
    /// Returns `None` when the conversation is not idle.
    fn begin_send(&self, id: ConversationId, content: &str, streaming: bool) -> Option<MessageId> {
        let mut provisional = None;
        self.update_if(|state| {
            if state.phase(id) != Phase::Idle {
                log::warn!("Conversation {} is busy, rejecting send", id);
                return false;
            }

            let seq = self.inner.next_provisional.fetch_add(1, Ordering::Relaxed);
            let message = Message::provisional(seq, id, content);
            provisional = Some(message.id());

            state.set_phase(id, if streaming { Phase::Sending } else { Phase::Posting });
            if state.is_active(id) {
                state.messages.push(message);
                state.messages_error = None;
                if streaming {
                    state.streaming = StreamingBuffer::open_for(id);
                }
            }
            true
        });
        provisional
    }

    fn apply_stream_event(&self, id: ConversationId, event: StreamEvent) {
        self.update_if(|state| match event {
            StreamEvent::Chunk { content } => {
                if !state.streaming.belongs_to(id) || !state.streaming.is_open() {
                    return false;
                }
                state.streaming.append(&content);
                true
            }
            StreamEvent::Done => {
                state.set_phase(id, Phase::Refreshing);
                if state.streaming.belongs_to(id) {
                    state.streaming.close();
                }
                true
            }
            StreamEvent::Error { detail } => {
                log::warn!("Stream for conversation {} failed: {}", id, detail);
                state.clear_streaming(id);
                if state.is_active(id) {
                    state.messages_error = Some(detail);
                }
                true
            }
        });
    }

    /// Fetch the authoritative list after a finished reply, then drop the
    /// buffered text and return to `Idle`.
    async fn reconcile(&self, id: ConversationId) {
        if self.inner.state.borrow().is_active(id) {
            self.fetch_messages(id).await;
        } else {
            log::debug!("Skipping refresh of conversation {}, no longer active", id);
        }

        self.update(|state| {
            state.clear_streaming(id);
            state.set_phase(id, Phase::Idle);
        });
    }

    fn rollback(&self, id: ConversationId, provisional: MessageId, error: Option<String>) {
        self.update(|state| {
            state.messages.retain(|m| m.id() != provisional);
            state.clear_streaming(id);
            state.set_phase(id, Phase::Idle);
            if let Some(error) = error.filter(|_| state.is_active(id)) {
                state.messages_error = Some(error);
            }
        });
    }

    fn update(&self, modify: impl FnOnce(&mut StoreState)) {
        self.inner.state.send_modify(modify);
    }

    fn update_if(&self, modify: impl FnOnce(&mut StoreState) -> bool) {
        self.inner.state.send_if_modified(modify);
    }
}
