/// Default page size when listing conversations
pub const CONVERSATIONS_LIMIT: usize = 20;

/// Default page size when listing messages of a conversation
pub const MESSAGES_LIMIT: usize = 50;

pub const API_ENDPOINT: &str = "http://localhost:8000";

pub const API_TOKEN_ENV: &str = "QA_CHAT_TOKEN";

pub const LOG_LEVEL: &str = "info";
