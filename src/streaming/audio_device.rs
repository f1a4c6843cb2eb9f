//! Audio device integration using rodio
//!
//! [`AudioDevice`] is the [`PcmSink`] handed to a clip worker; it owns the
//! rodio output stream for exactly as long as the worker holds it.

use super::{RingBuffer, BUFFER_BACKOFF_MICROS, MIN_LATENCY_MS, SOURCE_BATCH};
use crate::decoder::PcmFormat;
use crate::output::{pcm_to_f32, PcmSink, SinkProvider};
use crate::{ClipError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Audio source that reads from the ring buffer
struct RingBufferSource {
    ring: Arc<RingBuffer>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    /// Batch pulled from the ring buffer (reduces lock traffic)
    batch: Vec<f32>,
    batch_len: usize,
    batch_pos: usize,
}

impl RingBufferSource {
    fn new(ring: Arc<RingBuffer>, format: &PcmFormat, finished: Arc<AtomicBool>) -> Self {
        RingBufferSource {
            ring,
            sample_rate: format.sample_rate,
            channels: format.channels,
            finished,
            batch: vec![0.0; SOURCE_BATCH],
            batch_len: 0,
            batch_pos: 0,
        }
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        // format never changes mid-stream
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.batch_pos >= self.batch_len {
            if self.finished.load(Ordering::Acquire) && self.ring.is_empty() {
                return None;
            }

            let read = self.ring.read(&mut self.batch);
            if read == 0 {
                // underrun (clip paused or decoder behind): keep the stream alive with
                // one frame of silence
                let frame = (self.channels as usize).clamp(1, SOURCE_BATCH);
                self.batch[..frame].fill(0.0);
                self.batch_len = frame;
            } else {
                self.batch_len = read;
            }
            self.batch_pos = 0;
        }

        let sample = self.batch[self.batch_pos];
        self.batch_pos += 1;
        Some(sample)
    }
}

/// Playback device for one clip, using rodio's default output
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    ring: Arc<RingBuffer>,
    finished: Arc<AtomicBool>,
    format: PcmFormat,
    scratch: Vec<f32>,
    closed: bool,
}

impl AudioDevice {
    /// Open the default output for `format` with a ring buffer of roughly
    /// `buffer_bytes` of PCM (never below [`MIN_LATENCY_MS`]).
    ///
    /// The device starts paused; call [`PcmSink::start`] to begin output.
    pub fn open(format: &PcmFormat, buffer_bytes: usize) -> Result<Self> {
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(ClipError::UnsupportedFormat(format!(
                "cannot play {} channels at {} Hz",
                format.channels, format.sample_rate
            )));
        }

        let samples = buffer_bytes / format.sample_format.bytes();
        let floor = (format.sample_rate as usize * format.channels as usize
            * MIN_LATENCY_MS as usize)
            / 1000;
        let ring = Arc::new(RingBuffer::new(samples.max(floor))?);

        let (stream, handle) = OutputStream::try_default().map_err(|e| {
            ClipError::ResourceUnavailable(format!("Failed to create audio stream: {e}"))
        })?;
        let sink = Sink::try_new(&handle).map_err(|e| {
            ClipError::ResourceUnavailable(format!("Failed to create audio sink: {e}"))
        })?;
        sink.pause();

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            Arc::clone(&ring),
            format,
            Arc::clone(&finished),
        ));

        tracing::debug!(
            capacity = ring.capacity(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            "audio device opened"
        );

        Ok(AudioDevice {
            _stream: stream,
            sink,
            ring,
            finished,
            format: *format,
            scratch: Vec::new(),
            closed: false,
        })
    }

    /// Ring buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        let samples_per_sec = self.format.sample_rate as f32 * self.format.channels as f32;
        self.ring.capacity() as f32 / samples_per_sec * 1000.0
    }

    /// Push samples, backing off while the ring buffer is full
    fn write_blocking(&self, mut remaining: &[f32]) {
        while !remaining.is_empty() {
            let written = self.ring.write(remaining);
            if written == 0 {
                std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
            } else {
                remaining = &remaining[written..];
            }
        }
    }
}

impl PcmSink for AudioDevice {
    fn start(&mut self) -> Result<()> {
        self.sink.play();
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ClipError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "audio device is closed",
            )));
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        pcm_to_f32(pcm, self.format.sample_format, &mut scratch);
        self.write_blocking(&scratch);
        self.scratch = scratch;
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // let buffered audio play out, but never hang on a stalled device
        let deadline = Instant::now() + Duration::from_secs_f32(self.latency_ms() * 2.0 / 1000.0)
            + Duration::from_millis(200);
        while !self.ring.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        self.finished.store(true, Ordering::Release);
        self.ring.flush();
        self.sink.stop();
        tracing::debug!("audio device closed");
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// [`SinkProvider`] opening an [`AudioDevice`] per clip
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioSinkProvider;

impl RodioSinkProvider {
    /// Provider for the default output device
    pub fn new() -> Self {
        RodioSinkProvider
    }
}

impl SinkProvider for RodioSinkProvider {
    fn open(&self, format: &PcmFormat, buffer_bytes: usize) -> Result<Box<dyn PcmSink>> {
        Ok(Box::new(AudioDevice::open(format, buffer_bytes)?))
    }
}
