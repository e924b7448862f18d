use crate::config::{ApiConfig, user_agent, version};
use crate::config::constants::{CONVERSATIONS_LIMIT, MESSAGES_LIMIT};

use super::*;

#[test]
fn test_load_configuration() {
    let config = load_configuration("./testdata/config.toml").expect("failed to load config");

    assert_eq!(config.general.verbose, true);

    let log = &config.log;
    assert_eq!(log.level.as_deref(), Some("debug"));
    let log_filters = log.filters.as_deref().unwrap_or_default();
    assert_eq!(log_filters.len(), 1);
    assert_eq!(log_filters[0].module.as_deref(), Some("qa_chat::stream"));
    assert_eq!(log_filters[0].level.as_deref(), Some("trace"));

    let log_file = log.file.as_ref().expect("log file is set");
    assert_eq!(log_file.path, "/var/logs/qa-chat.log");
    assert_eq!(log_file.append, true);

    let api = &config.api;
    assert_eq!(api.endpoint, "https://qa.example.com/api");
    assert_eq!(api.token.as_deref(), Some("secret"));
    assert_eq!(api.timeout_secs, Some(60));
    assert_eq!(api.timeout(), Some(std::time::Duration::from_secs(60)));

    assert_eq!(config.paging.conversations_limit, 10);
    assert_eq!(config.paging.messages_limit, MESSAGES_LIMIT);
}

#[test]
fn test_default_configuration() {
    let config: Configuration = toml::from_str("").expect("failed to parse empty config");
    assert_eq!(config.general.verbose, false);
    assert_eq!(config.log.level.as_deref(), Some("info"));
    assert!(config.log.file.is_none());
    assert_eq!(config.api.endpoint, "http://localhost:8000");
    assert_eq!(config.api.token_env.as_deref(), Some("QA_CHAT_TOKEN"));
    assert_eq!(config.paging.conversations_limit, CONVERSATIONS_LIMIT);
    assert_eq!(config.paging.messages_limit, MESSAGES_LIMIT);
}

#[test]
fn test_resolve_token() {
    let api = ApiConfig {
        token: Some("literal".to_string()),
        token_env: Some("QA_CHAT_TEST_TOKEN_UNUSED".to_string()),
        ..Default::default()
    };
    assert_eq!(api.resolve_token().as_deref(), Some("literal"));

    unsafe { std::env::set_var("QA_CHAT_TEST_TOKEN", "from-env") };
    let api = ApiConfig {
        token: None,
        token_env: Some("QA_CHAT_TEST_TOKEN".to_string()),
        ..Default::default()
    };
    assert_eq!(api.resolve_token().as_deref(), Some("from-env"));

    let api = ApiConfig {
        token: Some(String::new()),
        token_env: Some("QA_CHAT_TEST_TOKEN_MISSING".to_string()),
        ..Default::default()
    };
    assert_eq!(api.resolve_token(), None);
}

#[test]
fn test_resolve_path() {
    unsafe { std::env::set_var("QA_CHAT_TEST_DIR", "/tmp/qa-chat") };
    let path = resolve_path("${QA_CHAT_TEST_DIR}/logs/app.log").expect("failed to resolve");
    assert_eq!(path, "/tmp/qa-chat/logs/app.log");

    let path = resolve_path("$QA_CHAT_TEST_DIR/app.log").expect("failed to resolve");
    assert_eq!(path, "/tmp/qa-chat/app.log");

    let path = resolve_path("/var/log/app.log").expect("failed to resolve");
    assert_eq!(path, "/var/log/app.log");
}

#[test]
fn test_basename() {
    assert_eq!(basename("src/stream/decoder.rs"), "decoder.rs");
    assert_eq!(basename("main.rs"), "main.rs");
}

#[test]
fn test_version_strings() {
    assert_eq!(user_agent(), format!("qa-chat/{}", env!("CARGO_PKG_VERSION")));
    assert!(version().starts_with(&format!("qa-chat {} (", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_instance_defaults_without_init() {
    assert!(!Configuration::instance().general.verbose);
}
