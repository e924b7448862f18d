pub mod conversation_store;
pub mod state;

pub use conversation_store::{ConversationStore, SendOutcome};
pub use state::{Phase, StoreState, StreamingBuffer};
