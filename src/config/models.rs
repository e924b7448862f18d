use std::time;

use serde::{Deserialize, Serialize};

use super::constants::{CONVERSATIONS_LIMIT, MESSAGES_LIMIT};
use super::defaults::*;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub paging: PagingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "log_level")]
    pub level: Option<String>,

    #[serde(default)]
    pub filters: Option<Vec<LogFilter>>,

    /// Log to stderr when no file is configured
    #[serde(default)]
    pub file: Option<LogFile>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFilter {
    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFile {
    pub path: String,

    #[serde(default)]
    pub append: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ApiConfig {
    #[serde(default = "api_endpoint")]
    pub endpoint: String,

    /// Bearer token. Takes precedence over `token_env`.
    #[serde(default)]
    pub token: Option<String>,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "api_token_env")]
    pub token_env: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u16>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PagingConfig {
    #[serde(default = "conversations_limit")]
    pub conversations_limit: usize,

    #[serde(default = "messages_limit")]
    pub messages_limit: usize,
}

impl ApiConfig {
    /// Resolve the bearer token, reading `token_env` when no literal token
    /// is configured.
    pub fn resolve_token(&self) -> Option<String> {
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            return Some(token.to_string());
        }
        let key = self.token_env.as_deref()?;
        std::env::var(key).ok().filter(|t| !t.is_empty())
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout_secs
            .map(|secs| time::Duration::from_secs(secs as u64))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log_level(),
            filters: None,
            file: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: api_endpoint(),
            token: None,
            token_env: api_token_env(),
            timeout_secs: None,
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            conversations_limit: CONVERSATIONS_LIMIT,
            messages_limit: MESSAGES_LIMIT,
        }
    }
}
