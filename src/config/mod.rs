//! Configuration file model, lookup and logger setup.

pub mod constants;
pub(crate) mod defaults;
pub mod models;
pub mod utils;

pub use models::*;
pub use utils::*;

use std::sync::OnceLock;

use eyre::Result;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Commit the binary was built from, set by release builds
pub const GIT_SHA: &str = match option_env!("GIT_SHA") {
    Some(v) => v,
    None => "unknown",
};

static CONFIG: OnceLock<Configuration> = OnceLock::new();

/// Value of the `User-Agent` header sent to the QA service.
pub fn user_agent() -> String {
    format!("{}/{}", APP_NAME, VERSION)
}

/// Line printed by `--version`.
pub fn version() -> String {
    format!("{} {} ({})", APP_NAME, VERSION, GIT_SHA)
}

impl Configuration {
    /// Process wide configuration. Falls back to the defaults when
    /// [`Configuration::init`] has not run, as in library use and tests.
    pub fn instance() -> &'static Configuration {
        CONFIG.get_or_init(Configuration::default)
    }

    pub fn init(config: Configuration) -> Result<()> {
        CONFIG
            .set(config)
            .map_err(|_| eyre::eyre!("configuration already initialized"))
    }
}

/// Print progress to stderr when `general.verbose` is enabled.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::config::Configuration::instance().general.verbose {
            eprintln!($($arg)*);
        }
    };
}

pub use verbose;
