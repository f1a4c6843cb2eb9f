//! Decoder boundary
//!
//! A [`Decoder`] turns an encoded byte source into a [`PcmStream`] of
//! interleaved little-endian PCM frames. The worker only looks at the
//! [`PcmFormat`] to size its buffers; everything else about the encoding
//! stays inside the decoder.

mod wav;

pub use wav::WavDecoder;

use crate::Result;
use std::io::{Read, Seek};

/// Buffered, seekable byte source handed to a decoder
pub trait MediaSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> MediaSource for T {}

/// Encoding of a single PCM sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned 8-bit, 128 = silence
    U8,
    /// Signed 16-bit
    I16,
    /// Signed 24-bit, packed in three bytes
    I24,
    /// Signed 32-bit
    I32,
    /// IEEE 754 single precision
    F32,
}

impl SampleFormat {
    /// Width of one sample in bytes
    pub fn bytes(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I24 => 3,
            SampleFormat::I32 | SampleFormat::F32 => 4,
        }
    }
}

/// Format descriptor of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Encoding of each sample
    pub sample_format: SampleFormat,
}

impl PcmFormat {
    /// Bytes per frame (one sample for every channel)
    pub fn frame_size(&self) -> usize {
        self.channels as usize * self.sample_format.bytes()
    }
}

/// Decoded PCM frames, read sequentially from the start of the source
pub trait PcmStream {
    /// Format of every frame produced by [`read`](PcmStream::read)
    fn format(&self) -> PcmFormat;

    /// Total number of frames, if the container declares it
    fn frame_len(&self) -> Option<u64>;

    /// Total length of the decoded stream in bytes
    fn byte_len(&self) -> Option<u64> {
        self.frame_len()
            .map(|frames| frames * self.format().frame_size() as u64)
    }

    /// Fill `buf` with whole frames.
    ///
    /// Returns the number of bytes written; `0` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Return to the first frame without reopening the source
    fn rewind(&mut self) -> Result<()>;
}

/// Factory for [`PcmStream`]s
pub trait Decoder: Send + Sync {
    /// Inspect `source` and start decoding it.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` when the data is not recognized, `Io` when the
    /// source cannot be read.
    fn open(&self, source: Box<dyn MediaSource>) -> Result<Box<dyn PcmStream>>;
}
