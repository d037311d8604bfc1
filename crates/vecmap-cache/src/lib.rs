//! Tile storage: asset inventory, decode-once cache, background loading and
//! candidate-driven eviction.
//!
//! [`TileStore`] is the entry point used by the render thread. It owns a
//! shared [`TileCache`] and an optional [`BackgroundLoader`] that pre-decodes
//! tiles the view logic expects to need soon.

pub mod cache;
pub mod error;
pub mod loader;
pub mod source;
pub mod store;

pub use cache::{StoreStats, TileCache};
pub use error::{LoadError, SourceError, StoreError};
pub use loader::BackgroundLoader;
pub use source::{DirectorySource, MemorySource, TileSource};
pub use store::{ReleaseHook, StoreOptions, TileStore};
