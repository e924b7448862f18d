pub mod conversation;
pub mod event;
pub mod message;
pub mod request;
pub(crate) mod timestamp;

pub use conversation::{Conversation, ConversationId, ConversationPage};
pub use event::StreamEvent;
pub use message::{Message, MessageId, MessagePage, Role};
pub use request::{Page, SendOptions, StreamRequest};
