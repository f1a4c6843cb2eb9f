//! Clip worker: file → decoder → sink

use super::control::{ClipControl, Resume};
use super::{Backend, ClipOptions};
use crate::config::MIN_BUFFER_SIZE;
use crate::decoder::MediaSource;
use crate::output::SinkGuard;
use crate::playable::{validate_loops, ClipTask, Playable, PlayableState};
use crate::Result;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// An audio file streamed from disk on its own worker thread.
///
/// Construct it, hand an `Arc` of it to
/// [`AudioManager::play`](crate::AudioManager::play), then drive it through
/// the [`Playable`] methods from any thread.
pub struct StreamedClip {
    path: PathBuf,
    play_when_ready: bool,
    buffer_size: usize,
    backend: Backend,
    control: ClipControl,
    started: AtomicBool,
}

impl StreamedClip {
    /// Clip that plays once, as soon as it is ready
    pub fn new<P: Into<PathBuf>>(path: P, backend: Backend) -> Self {
        Self::build(path.into(), backend, ClipOptions::default())
    }

    /// Clip with explicit options
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `options.loops` is neither ≥ 1 nor `LOOP_FOREVER`.
    pub fn with_options<P: Into<PathBuf>>(
        path: P,
        backend: Backend,
        options: ClipOptions,
    ) -> Result<Self> {
        validate_loops(options.loops)?;
        Ok(Self::build(path.into(), backend, options))
    }

    /// `options.loops` must already be valid
    fn build(path: PathBuf, backend: Backend, options: ClipOptions) -> Self {
        StreamedClip {
            path,
            play_when_ready: options.play_when_ready,
            buffer_size: options.buffer_size.max(MIN_BUFFER_SIZE),
            backend,
            control: ClipControl::new(options.loops),
            started: AtomicBool::new(false),
        }
    }

    /// File this clip streams from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transfer buffer capacity in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Whether the clip starts playing once initialized
    pub fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    /// Block until initialization is over; returns the state at that point
    pub fn wait_until_ready(&self) -> PlayableState {
        self.control
            .wait_for(None, |s| s != PlayableState::Initializing)
    }

    /// Like [`wait_until_ready`](Self::wait_until_ready) with a timeout.
    /// Returns `false` if the clip was still initializing when it elapsed.
    pub fn wait_until_ready_for(&self, timeout: Duration) -> bool {
        self.control
            .wait_for(Some(timeout), |s| s != PlayableState::Initializing)
            != PlayableState::Initializing
    }

    /// Block until the clip is finished
    pub fn wait_until_finished(&self) {
        self.control.wait_for(None, |s| s == PlayableState::Finished);
    }

    /// Like [`wait_until_finished`](Self::wait_until_finished) with a timeout.
    /// Returns `true` if the clip finished in time.
    pub fn wait_until_finished_for(&self, timeout: Duration) -> bool {
        self.control
            .wait_for(Some(timeout), |s| s == PlayableState::Finished)
            == PlayableState::Finished
    }

    fn stream(&self) -> Result<()> {
        let file = File::open(&self.path)?;
        let source: Box<dyn MediaSource> = Box::new(BufReader::new(file));
        let mut pcm = self.backend.decoder().open(source)?;

        let format = pcm.format();
        let total_len = pcm.byte_len();
        tracing::debug!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            sample_format = ?format.sample_format,
            total_len = ?total_len,
            "decoder opened"
        );

        let mut sink = SinkGuard::new(self.backend.sinks().open(&format, self.buffer_size)?);
        sink.start()?;

        let mut buffer = vec![0u8; transfer_len(total_len, self.buffer_size, format.frame_size())];
        self.control.mark_ready(self.play_when_ready);

        // nothing read since the last rewind
        let mut empty_pass = true;
        loop {
            match self.control.await_playing() {
                Resume::Finished => break,
                Resume::Read { rewind: true } => {
                    pcm.rewind()?;
                    empty_pass = true;
                }
                Resume::Read { rewind: false } => {}
            }

            let read = pcm.read(&mut buffer)?;
            if read == 0 {
                if self.control.end_of_stream(empty_pass) {
                    tracing::debug!(loops = self.control.loops(), "looping");
                    continue;
                }
                break;
            }

            empty_pass = false;
            sink.write(&buffer[..read])?;
        }

        Ok(())
    }
}

/// Bytes moved per read: the whole stream if it fits in the buffer,
/// rounded down to whole frames, and never less than one frame.
fn transfer_len(total_len: Option<u64>, buffer_size: usize, frame_size: usize) -> usize {
    let len = match total_len {
        Some(total) => (total.min(buffer_size as u64)) as usize,
        None => buffer_size,
    };
    (len - len % frame_size).max(frame_size)
}

impl ClipTask for StreamedClip {
    fn run(&self) {
        let span = tracing::info_span!("clip", path = %self.path.display());
        let _enter = span.enter();

        // a clip owns one decode handle for one run; later runs are ignored
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("clip already started, ignoring");
            return;
        }

        if let Err(err) = self.stream() {
            tracing::error!(error = %err, "playback aborted");
        }

        self.control.finish();
        tracing::debug!("finished");
    }
}

impl Playable for StreamedClip {
    fn play(&self) -> bool {
        self.control.play()
    }

    fn play_loops(&self, loops: i32) -> Result<bool> {
        self.control.play_loops(loops)
    }

    fn pause(&self) -> bool {
        self.control.pause()
    }

    fn stop(&self) {
        self.control.stop();
    }

    fn set_loops(&self, loops: i32) -> Result<()> {
        self.control.set_loops(loops)
    }

    fn loops(&self) -> i32 {
        self.control.loops()
    }

    fn state(&self) -> PlayableState {
        self.control.state()
    }
}

impl fmt::Display for StreamedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl fmt::Debug for StreamedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedClip")
            .field("path", &self.path)
            .field("play_when_ready", &self.play_when_ready)
            .field("buffer_size", &self.buffer_size)
            .field("control", &self.control)
            .finish()
    }
}
