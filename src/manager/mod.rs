//! Playback manager
//!
//! Runs every submitted clip's worker on a bounded pool so callers never
//! block. Clips beyond the pool size wait in submission order.

mod pool;

use crate::config::PlaybackConfig;
use crate::playable::ClipTask;
use crate::Result;
use pool::WorkerPool;
use std::sync::Arc;

/// Schedules clip workers on a fixed number of threads
pub struct AudioManager {
    pool: WorkerPool,
}

impl AudioManager {
    /// Create a manager with `config.concurrency()` worker threads
    pub fn new(config: &PlaybackConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.concurrency(), "AudioManager")?;
        tracing::debug!(threads = pool.size(), "audio manager started");
        Ok(AudioManager { pool })
    }

    /// Queue `clip` for playback without blocking.
    ///
    /// The clip's worker starts as soon as a thread is free. A
    /// [`StreamedClip`](crate::StreamedClip) plays at most once; submitting it
    /// again only logs a warning.
    pub fn play<C>(&self, clip: Arc<C>) -> Result<()>
    where
        C: ClipTask + 'static,
    {
        self.pool.execute(move || clip.run())
    }

    /// Maximum number of clips playing at once
    pub fn concurrency(&self) -> usize {
        self.pool.size()
    }

    /// Clips whose workers are currently running
    pub fn active_clips(&self) -> usize {
        self.pool.active()
    }

    /// Clips waiting for a free thread
    pub fn queued_clips(&self) -> usize {
        self.pool.queued()
    }

    /// Stop accepting clips and wait for every queued and running clip to
    /// finish. A paused clip holds its thread until it is resumed, so this
    /// can block indefinitely.
    pub fn shutdown(mut self) {
        self.pool.join();
    }
}
