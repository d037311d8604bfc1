//! Background tile loader.
//!
//! A single named worker thread takes positions from a queue and calls
//! [`TileCache::get`] on each, so it shares the cache's decode-once lock with
//! synchronous misses on the render thread. Replacing the queue drops entries
//! not yet started; a decode already running always completes.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use tracing::debug;
use vecmap_tile::TilePosition;

use crate::cache::TileCache;
use crate::error::StoreError;

pub struct BackgroundLoader {
    queue_tx: Option<Sender<TilePosition>>,
    /// Kept to drain stale entries when the queue is replaced.
    queue_rx: Receiver<TilePosition>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundLoader {
    /// Spawns the worker thread.
    pub fn spawn(cache: Arc<TileCache>, thread_name: &str) -> Result<Self, StoreError> {
        let (queue_tx, queue_rx) = unbounded::<TilePosition>();
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();

        let rx = queue_rx.clone();
        let handle = std::thread::Builder::new()
            .name(thread_name.to_owned())
            .spawn(move || worker_loop(&cache, &rx, &shutdown_rx))
            .map_err(StoreError::SpawnLoader)?;

        Ok(Self {
            queue_tx: Some(queue_tx),
            queue_rx,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Discards queued positions and enqueues `positions` in order.
    pub fn replace_queue(&self, positions: impl IntoIterator<Item = TilePosition>) {
        let Some(tx) = &self.queue_tx else {
            return;
        };
        let mut dropped = 0usize;
        while self.queue_rx.try_recv().is_ok() {
            dropped += 1;
        }
        let mut queued = 0usize;
        for pos in positions {
            if tx.send(pos).is_err() {
                break;
            }
            queued += 1;
        }
        debug!("Loader queue replaced: {queued} queued, {dropped} stale dropped");
    }

    /// Positions waiting to be loaded.
    pub fn pending(&self) -> usize {
        self.queue_rx.len()
    }

    /// Stops the worker after its current decode and joins it.
    pub fn shutdown(&mut self) {
        self.shutdown_tx.take();
        self.queue_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(cache: &TileCache, queue: &Receiver<TilePosition>, shutdown: &Receiver<()>) {
    debug!("Tile loader started");
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(queue) -> msg => match msg {
                Ok(pos) => {
                    if !cache.is_loaded(pos) {
                        cache.get(pos);
                    }
                }
                Err(_) => break,
            },
        }
    }
    debug!("Tile loader stopped");
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::cache::tests::{counting_source, tile_bytes};
    use crate::error::SourceError;
    use crate::source::{MemorySource, TileSource};

    fn pos(tx: u32, ty: u32) -> TilePosition {
        TilePosition::new(0, tx, ty).unwrap()
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    /// Blocks every `open` until the test grants a permit.
    struct GatedSource {
        inner: MemorySource,
        entered: Sender<String>,
        permits: Receiver<()>,
        opens: AtomicUsize,
    }

    impl TileSource for GatedSource {
        fn list_tile_files(&self) -> Result<Vec<String>, SourceError> {
            self.inner.list_tile_files()
        }

        fn open(&self, file_name: &str) -> Result<Box<dyn Read + Send>, SourceError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let _ = self.entered.send(file_name.to_owned());
            let _ = self.permits.recv();
            self.inner.open(file_name)
        }
    }

    #[test]
    fn test_loader_loads_queued_tiles() {
        let tiles = [pos(0, 0), pos(0, 1), pos(1, 0)];
        let cache = Arc::new(TileCache::new(counting_source(&tiles)).unwrap());
        let loader = BackgroundLoader::spawn(Arc::clone(&cache), "tile-loader").unwrap();

        loader.replace_queue(tiles);
        assert!(wait_until(|| tiles.iter().all(|&p| cache.is_loaded(p))));
        assert_eq!(cache.stats().decoded, 3);
    }

    #[test]
    fn test_replace_queue_drops_stale_entries() {
        let (a, b, c) = (pos(0, 0), pos(0, 1), pos(0, 2));
        let mut inner = MemorySource::new();
        for p in [a, b, c] {
            inner.insert_tile(p, tile_bytes(p));
        }
        let (entered_tx, entered_rx) = unbounded();
        let (permit_tx, permit_rx) = unbounded();
        let source = Arc::new(GatedSource {
            inner,
            entered: entered_tx,
            permits: permit_rx,
            opens: AtomicUsize::new(0),
        });
        let cache = Arc::new(TileCache::new(source.clone()).unwrap());
        let loader = BackgroundLoader::spawn(Arc::clone(&cache), "tile-loader").unwrap();

        loader.replace_queue([a]);
        assert_eq!(
            entered_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            a.file_name()
        );

        // Worker is blocked inside `a`; b is replaced before it starts.
        loader.replace_queue([b, c]);
        loader.replace_queue([c]);
        assert_eq!(loader.pending(), 1);

        permit_tx.send(()).unwrap();
        permit_tx.send(()).unwrap();
        assert!(wait_until(|| cache.is_loaded(c)));
        assert!(cache.is_loaded(a));
        assert!(!cache.is_loaded(b));
        assert_eq!(source.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shutdown_joins_idle_worker() {
        let cache = Arc::new(TileCache::new(counting_source(&[pos(0, 0)])).unwrap());
        let mut loader = BackgroundLoader::spawn(cache, "tile-loader").unwrap();
        loader.shutdown();
        assert_eq!(loader.pending(), 0);
        loader.replace_queue([pos(0, 0)]);
        assert_eq!(loader.pending(), 0);
    }
}
