//! Streamed audio clip playback
//!
//! Plays audio files by streaming them from disk through a decoder and into
//! an output sink, one worker thread per clip. Each clip exposes
//! play/pause/stop/loop controls that are safe to call from any thread while
//! its worker is running.
//!
//! # Features
//! - Per-clip state machine (`Initializing` → `Paused` ⇄ `Playing` → `Finished`)
//! - Finite and infinite looping
//! - Bounded pool of playback workers with FIFO queuing
//! - WAV decoding through `hound`
//! - Optional real-time output through `rodio`
//!
//! # Crate feature flags
//! - `streaming` (opt-in): Real-time audio output (enables optional `rodio` dep)
//!   and the `clipstream` command-line player
//!
//! # Quick start
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use std::sync::Arc;
//! use clipstream::{AudioManager, Backend, PlaybackConfig, Playable, StreamedClip};
//!
//! let config = PlaybackConfig::default();
//! let manager = AudioManager::new(&config).unwrap();
//! let clip = Arc::new(StreamedClip::new("res/test.wav", Backend::default_output()));
//! clip.set_loops(2).unwrap();
//! manager.play(Arc::clone(&clip)).unwrap();
//! clip.wait_until_finished();
//! # }
//! ```

#![warn(missing_docs)]

pub mod clip; // Streamed clip + worker loop
pub mod config; // Tunables
pub mod decoder; // Decoder boundary
pub mod manager; // Worker pool
pub mod output; // Sink boundary
pub mod playable; // Playback control contract
#[cfg(feature = "streaming")]
pub mod streaming; // Audio Output & Streaming

/// Error types for clip playback
#[derive(thiserror::Error, Debug)]
pub enum ClipError {
    /// Argument outside its accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Source encoding not recognized by the decoder
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// IO error from the source or the sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output sink or worker thread could not be acquired
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<hound::Error> for ClipError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => ClipError::Io(io),
            other => ClipError::UnsupportedFormat(other.to_string()),
        }
    }
}

/// Result type for clip operations
pub type Result<T> = std::result::Result<T, ClipError>;

// Public API exports
pub use clip::{Backend, ClipOptions, StreamedClip};
pub use config::PlaybackConfig;
pub use decoder::{Decoder, MediaSource, PcmFormat, PcmStream, SampleFormat, WavDecoder};
pub use manager::AudioManager;
pub use output::{PcmSink, SinkGuard, SinkProvider};
pub use playable::{ClipTask, Playable, PlayableState, LOOP_FOREVER};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, RingBuffer, RodioSinkProvider};
