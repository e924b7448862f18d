#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use eyre::{Context, Result};

use crate::config::{self, Configuration, load_configuration, lookup_config_path};
use crate::models::{ConversationId, SendOptions};

#[derive(Debug, Parser)]
#[command(
    version,
    about,
    long_about = r#"A command line client for the conversational QA service

Default configuration file location looks up in the following order:
    * $XDG_CONFIG_HOME/qa-chat/config.toml
    * $HOME/.config/qa-chat/config.toml
    * $HOME/.qa-chat.toml
"#,
    disable_version_flag = true
)]
pub struct Command {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Show the version
    #[arg(short, long)]
    version: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Action {
    /// List conversations, most recent first
    List {
        /// Number of conversations to skip
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Page size, defaults to the configured limit
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Create a new conversation
    Create { title: String },

    /// Delete a conversation
    Delete { id: ConversationId },

    /// Print the messages of a conversation
    History { id: ConversationId },

    /// Send one message and stream the reply
    Send {
        id: ConversationId,

        content: String,

        #[command(flatten)]
        options: SendArgs,
    },

    /// Chat interactively in a conversation. Ctrl-C stops the current reply.
    Chat {
        id: ConversationId,

        #[command(flatten)]
        options: SendArgs,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct SendArgs {
    /// Let the server consult the knowledge base
    #[arg(long)]
    rag: bool,

    /// Attach an image file
    #[arg(long, value_name = "PATH")]
    image: Option<String>,
}

impl Command {
    pub fn new() -> Command {
        Self::parse()
    }

    pub fn get_config(&self) -> Result<Configuration> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| lookup_config_path().unwrap_or_default());

        if config_path.is_empty() {
            // No config path is specified just use the default config
            return Ok(Configuration::default());
        }
        Ok(load_configuration(config_path.as_str()).wrap_err("loading configuration")?)
    }

    pub fn version(&self) -> bool {
        self.version
    }

    pub fn print_version(&self) {
        println!("{}", config::version())
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }
}

impl SendArgs {
    /// Build the send modifiers, reading and encoding the image if one was
    /// given.
    pub async fn to_options(&self) -> Result<SendOptions> {
        let mut options = SendOptions::default().with_rag(self.rag);
        if let Some(path) = self.image.as_deref() {
            let path = config::resolve_path(path)?;
            let bytes = tokio::fs::read(&path)
                .await
                .wrap_err(format!("reading image {}", path))?;
            options = options.with_image(STANDARD.encode(bytes));
        }
        Ok(options)
    }
}
