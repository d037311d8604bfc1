//! Wall-clock time between frames for LOD blending.

use std::time::Instant;

use tracing::debug;

/// Measures seconds between consecutive frames.
///
/// A gap longer than `max_delta` (a stall, a debugger pause, a suspended
/// window) reports zero so blends resume where they were instead of jumping.
pub struct FrameClock {
    previous: Option<Instant>,
    max_delta: f32,
    frame_count: u64,
    skipped: u64,
}

impl FrameClock {
    pub fn new(max_delta_secs: f32) -> Self {
        Self {
            previous: None,
            max_delta: max_delta_secs,
            frame_count: 0,
            skipped: 0,
        }
    }

    /// Seconds since the previous call; zero on the first.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) with an explicit timestamp.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let elapsed = self
            .previous
            .map_or(0.0, |prev| now.saturating_duration_since(prev).as_secs_f32());
        self.previous = Some(now);
        self.frame_count += 1;

        if elapsed > self.max_delta {
            debug!(
                "Frame gap {:.0}ms exceeds {:.0}ms, treating as paused",
                elapsed * 1000.0,
                self.max_delta * 1000.0
            );
            self.skipped += 1;
            return 0.0;
        }
        elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames whose gap was discarded.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
