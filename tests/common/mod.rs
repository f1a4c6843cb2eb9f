//! Shared fixtures: WAV files on disk and a sink that records what it gets.

#![allow(dead_code)]

use clipstream::{ClipError, PcmFormat, PcmSink, Result, SinkProvider};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Write a 16-bit mono WAV file and return its path
pub fn write_wav(dir: &Path, name: &str, samples: &[i16], sample_rate: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for &s in samples {
        writer.write_sample(s).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

/// One second of a ramp at `sample_rate`, distinct enough to spot misordering
pub fn one_second(sample_rate: u32) -> Vec<i16> {
    (0..sample_rate).map(|i| (i % 30_000) as i16 - 15_000).collect()
}

/// PCM bytes the decoder is expected to produce for `samples`
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

type WriteHook = Box<dyn Fn(usize) + Send + Sync>;

/// Everything a [`RecordingSinks`] provider has seen
#[derive(Default)]
pub struct Recording {
    pub opens: AtomicUsize,
    pub starts: AtomicUsize,
    pub closes: AtomicUsize,
    pub writes: AtomicUsize,
    pub data: Mutex<Vec<u8>>,
    pub formats: Mutex<Vec<PcmFormat>>,
    on_write: Mutex<Option<WriteHook>>,
}

impl Recording {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// Called on the worker thread after each write, with the write's index
    pub fn on_write(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.on_write.lock() = Some(Box::new(hook));
    }
}

/// Sink provider that stores every byte written, or refuses to open
pub struct RecordingSinks {
    pub recording: Arc<Recording>,
    fail_open: bool,
}

impl RecordingSinks {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingSinks {
            recording: Arc::new(Recording::default()),
            fail_open: false,
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(RecordingSinks {
            recording: Arc::new(Recording::default()),
            fail_open: true,
        })
    }
}

impl SinkProvider for RecordingSinks {
    fn open(&self, format: &PcmFormat, _buffer_bytes: usize) -> Result<Box<dyn PcmSink>> {
        if self.fail_open {
            return Err(ClipError::ResourceUnavailable("device busy".into()));
        }
        self.recording.opens.fetch_add(1, Ordering::SeqCst);
        self.recording.formats.lock().push(*format);
        Ok(Box::new(RecordingSink {
            recording: Arc::clone(&self.recording),
        }))
    }
}

struct RecordingSink {
    recording: Arc<Recording>,
}

impl PcmSink for RecordingSink {
    fn start(&mut self) -> Result<()> {
        self.recording.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        self.recording.data.lock().extend_from_slice(pcm);
        let index = self.recording.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.recording.on_write.lock().as_ref() {
            hook(index);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.recording.closes.fetch_add(1, Ordering::SeqCst);
    }
}
