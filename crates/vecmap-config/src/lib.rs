//! Configuration for the vector map viewer.
//!
//! Settings persist to disk as `config.ron`. Command-line flags override
//! the loaded values for a single run.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{AssetsConfig, Config, DebugConfig, LoaderConfig, LodSettings, ViewConfig};
pub use error::ConfigError;
