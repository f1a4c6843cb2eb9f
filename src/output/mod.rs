//! Sink boundary
//!
//! A [`SinkProvider`] acquires a [`PcmSink`] for one clip. Sinks follow an
//! open → start → write* → close lifecycle and live entirely on the clip's
//! worker thread, so they do not need to be `Send`.

use crate::decoder::{PcmFormat, SampleFormat};
use crate::Result;

/// Output destination for decoded PCM frames
pub trait PcmSink {
    /// Begin accepting writes
    fn start(&mut self) -> Result<()>;

    /// Write interleaved little-endian frames, blocking until all are accepted
    fn write(&mut self, pcm: &[u8]) -> Result<()>;

    /// Release the underlying device
    fn close(&mut self);
}

/// Factory for [`PcmSink`]s, shared by all clips of a backend
pub trait SinkProvider: Send + Sync {
    /// Acquire a sink for `format` with room for `buffer_bytes` of PCM.
    ///
    /// # Errors
    ///
    /// `ResourceUnavailable` when no matching output can be acquired.
    fn open(&self, format: &PcmFormat, buffer_bytes: usize) -> Result<Box<dyn PcmSink>>;
}

/// Closes the wrapped sink when dropped, on every exit path
pub struct SinkGuard {
    sink: Box<dyn PcmSink>,
}

impl SinkGuard {
    /// Take ownership of an opened sink
    pub fn new(sink: Box<dyn PcmSink>) -> Self {
        SinkGuard { sink }
    }

    /// See [`PcmSink::start`]
    pub fn start(&mut self) -> Result<()> {
        self.sink.start()
    }

    /// See [`PcmSink::write`]
    pub fn write(&mut self, pcm: &[u8]) -> Result<()> {
        self.sink.write(pcm)
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        self.sink.close();
    }
}

/// Convert interleaved little-endian PCM to normalized f32 samples.
///
/// Appends to `out`; a trailing partial sample is ignored.
pub fn pcm_to_f32(pcm: &[u8], format: SampleFormat, out: &mut Vec<f32>) {
    let width = format.bytes();
    out.reserve(pcm.len() / width);

    for chunk in pcm.chunks_exact(width) {
        let sample = match format {
            SampleFormat::U8 => (chunk[0] as f32 - 128.0) / 128.0,
            SampleFormat::I16 => i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0,
            SampleFormat::I24 => {
                // sign-extend by placing the 24 bits high and shifting back
                let raw = i32::from_le_bytes([0, chunk[0], chunk[1], chunk[2]]) >> 8;
                raw as f32 / 8_388_608.0
            }
            SampleFormat::I32 => {
                (i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64
                    / 2_147_483_648.0) as f32
            }
            SampleFormat::F32 => f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        };
        out.push(sample);
    }
}
