use vecmap_cache::StoreError;
use vecmap_config::ConfigError;

use crate::platform::PlatformError;

/// Startup failures of the `vecmap` driver.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open tile store: {0}")]
    Store(#[from] StoreError),
}
