//! Playback tunables
//!
//! Values are read once, when a manager or clip is constructed. Anything
//! missing from a configuration file falls back to the defaults below.

use crate::{ClipError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of clips that may play at the same time
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Smallest accepted worker count
pub const MIN_CONCURRENCY: usize = 1;

/// Default transfer buffer size in bytes (4 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 12;

/// Smallest accepted transfer buffer size in bytes (1 KiB)
pub const MIN_BUFFER_SIZE: usize = 1 << 10;

/// Configuration for clip playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum number of clips whose workers run concurrently.
    /// Clips beyond this limit wait in FIFO order.
    pub concurrency: usize,

    /// Per-clip transfer buffer size in bytes, also used to size the sink.
    /// Larger buffers = more latency but less chance of underrun
    pub buffer_size: usize,
}

impl PlaybackConfig {
    /// Parse a configuration from JSON, e.g. `{"concurrency": 4}`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ClipError::ConfigError(e.to_string()))
    }

    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Worker count with the minimum applied
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(MIN_CONCURRENCY)
    }

    /// Buffer size with the 1 KiB floor applied
    pub fn buffer_size(&self) -> usize {
        self.buffer_size.max(MIN_BUFFER_SIZE)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            concurrency: DEFAULT_CONCURRENCY,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
