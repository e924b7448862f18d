use super::constants::*;

pub(crate) fn log_level() -> Option<String> {
    Some(LOG_LEVEL.to_string())
}

pub(crate) fn api_endpoint() -> String {
    API_ENDPOINT.to_string()
}

pub(crate) fn api_token_env() -> Option<String> {
    Some(API_TOKEN_ENV.to_string())
}

pub(crate) fn conversations_limit() -> usize {
    CONVERSATIONS_LIMIT
}

pub(crate) fn messages_limit() -> usize {
    MESSAGES_LIMIT
}
