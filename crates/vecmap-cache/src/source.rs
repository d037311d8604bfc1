//! Read-only tile asset stores.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;
use tracing::debug;
use vecmap_tile::TilePosition;

use crate::error::SourceError;

/// Byte source for tile files.
///
/// `list_tile_files` runs once at startup to build the inventory; `open` is
/// called on demand from whichever thread decodes the tile.
pub trait TileSource: Send + Sync {
    /// File names of every tile the source holds.
    fn list_tile_files(&self) -> Result<Vec<String>, SourceError>;

    /// Opens one tile file by name.
    fn open(&self, file_name: &str) -> Result<Box<dyn Read + Send>, SourceError>;
}

/// Tiles stored as `tri_*.tri` files anywhere below a root directory.
pub struct DirectorySource {
    root: PathBuf,
    paths: Mutex<FxHashMap<String, PathBuf>>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: Mutex::new(FxHashMap::default()),
        }
    }

    /// The directory being searched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(dir: &Path, found: &mut FxHashMap<String, PathBuf>) -> Result<(), SourceError> {
        let io_err = |source| SourceError::Io {
            path: dir.to_path_buf(),
            source,
        };
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if entry.file_type().map_err(io_err)?.is_dir() {
                Self::walk(&path, found)?;
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("tri_") && name.ends_with(".tri") {
                    found.insert(name.to_owned(), path.clone());
                }
            }
        }
        Ok(())
    }
}

impl TileSource for DirectorySource {
    fn list_tile_files(&self) -> Result<Vec<String>, SourceError> {
        let mut found = FxHashMap::default();
        Self::walk(&self.root, &mut found)?;
        debug!("Found {} tile files under {}", found.len(), self.root.display());

        let mut names: Vec<String> = found.keys().cloned().collect();
        names.sort_unstable();
        *self.paths.lock().unwrap_or_else(PoisonError::into_inner) = found;
        Ok(names)
    }

    fn open(&self, file_name: &str) -> Result<Box<dyn Read + Send>, SourceError> {
        let path = self
            .paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| self.root.join(file_name));
        let file = File::open(&path).map_err(|source| SourceError::Io { path, source })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Tiles held in memory, keyed by file name.
#[derive(Default)]
pub struct MemorySource {
    files: FxHashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(file_name.into(), bytes.into());
    }

    /// Adds a tile under its canonical file name.
    pub fn insert_tile(&mut self, position: TilePosition, bytes: impl Into<Arc<[u8]>>) {
        self.insert(position.file_name(), bytes);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl TileSource for MemorySource {
    fn list_tile_files(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn open(&self, file_name: &str) -> Result<Box<dyn Read + Send>, SourceError> {
        let bytes = self
            .files
            .get(file_name)
            .ok_or_else(|| SourceError::NotFound(file_name.to_owned()))?;
        Ok(Box::new(Cursor::new(Arc::clone(bytes))))
    }
}
