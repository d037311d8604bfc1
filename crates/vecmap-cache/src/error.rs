//! Error types for the tile asset layer and the store.

use std::io;
use std::path::PathBuf;

use vecmap_tile::DecodeError;

/// Errors from a [`crate::TileSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tile file not found: {0}")]
    NotFound(String),
}

/// Why a single tile could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors constructing a [`crate::TileStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The tile inventory could not be listed.
    #[error("failed to inventory tiles: {0}")]
    Inventory(#[from] SourceError),

    /// The background loader thread could not be started.
    #[error("failed to spawn tile loader thread: {0}")]
    SpawnLoader(#[source] io::Error),
}
