//! # Keystone Log
//!
//! Tracing subscriber bootstrap shared by Keystone services and tools.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> Result<(), keystone_log::LogError> {
//!     let _guard = keystone_log::auto_init()?;
//!     tracing::info!(port = 8090, "catalog service starting");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod builder;
mod config;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Fields, Format};

/// Result of installing a subscriber
pub type LogResult<T> = Result<T, LogError>;

/// Why a subscriber could not be installed
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The level directive is not a valid `EnvFilter`
    #[error("Invalid filter: {0}")]
    Filter(String),

    /// Something else already owns the global dispatcher
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Pick a configuration from the environment and build type, then install it.
///
/// `KEYSTONE_LOG` or `RUST_LOG` switch to [`Config::from_env`]; otherwise debug
/// builds use [`Config::development`] and release builds [`Config::production`].
pub fn auto_init() -> LogResult<LoggerGuard> {
    if std::env::var("KEYSTONE_LOG").is_ok() || std::env::var("RUST_LOG").is_ok() {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Install [`Config::default`]
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Install the given configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
