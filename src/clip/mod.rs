//! Streamed clips
//!
//! A [`StreamedClip`] decodes its file incrementally on a worker thread and
//! pushes PCM to a sink, so memory use is bounded by the transfer buffer no
//! matter how long the file is.

mod control;
mod streamed;

pub use streamed::StreamedClip;

use crate::config::{PlaybackConfig, DEFAULT_BUFFER_SIZE};
use crate::decoder::{Decoder, WavDecoder};
use crate::output::SinkProvider;
use std::sync::Arc;

/// Decoder and sink collaborators used by a clip's worker
#[derive(Clone)]
pub struct Backend {
    decoder: Arc<dyn Decoder>,
    sinks: Arc<dyn SinkProvider>,
}

impl Backend {
    /// Pair an arbitrary decoder with a sink provider
    pub fn new(decoder: Arc<dyn Decoder>, sinks: Arc<dyn SinkProvider>) -> Self {
        Backend { decoder, sinks }
    }

    /// WAV decoding into the given sinks
    pub fn wav(sinks: Arc<dyn SinkProvider>) -> Self {
        Self::new(Arc::new(WavDecoder::new()), sinks)
    }

    /// WAV decoding into the default system output
    #[cfg(feature = "streaming")]
    pub fn default_output() -> Self {
        Self::wav(Arc::new(crate::streaming::RodioSinkProvider::new()))
    }

    pub(crate) fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }

    pub(crate) fn sinks(&self) -> &dyn SinkProvider {
        self.sinks.as_ref()
    }
}

/// Construction-time settings for a [`StreamedClip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipOptions {
    /// Start playing as soon as initialization completes
    pub play_when_ready: bool,
    /// Transfer buffer size in bytes (1 KiB floor applied at construction)
    pub buffer_size: usize,
    /// Initial loop count, ≥ 1 or [`LOOP_FOREVER`](crate::LOOP_FOREVER)
    pub loops: i32,
}

impl ClipOptions {
    /// Options carrying the buffer size of `config`
    pub fn from_config(config: &PlaybackConfig) -> Self {
        ClipOptions {
            buffer_size: config.buffer_size(),
            ..Self::default()
        }
    }

    /// Set whether the clip starts playing once ready
    pub fn play_when_ready(mut self, play: bool) -> Self {
        self.play_when_ready = play;
        self
    }

    /// Set the initial loop count
    pub fn loops(mut self, loops: i32) -> Self {
        self.loops = loops;
        self
    }
}

impl Default for ClipOptions {
    fn default() -> Self {
        ClipOptions {
            play_when_ready: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            loops: 1,
        }
    }
}
