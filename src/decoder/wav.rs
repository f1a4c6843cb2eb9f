//! WAV decoding through `hound`

use super::{Decoder, MediaSource, PcmFormat, PcmStream, SampleFormat};
use crate::{ClipError, Result};
use hound::WavReader;

/// Decoder for RIFF/WAVE files with integer or float PCM data
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl WavDecoder {
    /// Create a WAV decoder
    pub fn new() -> Self {
        WavDecoder
    }
}

impl Decoder for WavDecoder {
    fn open(&self, source: Box<dyn MediaSource>) -> Result<Box<dyn PcmStream>> {
        let reader = WavReader::new(source)?;
        let spec = reader.spec();

        let sample_format = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 1..=8) => SampleFormat::U8,
            (hound::SampleFormat::Int, 9..=16) => SampleFormat::I16,
            (hound::SampleFormat::Int, 17..=24) => SampleFormat::I24,
            (hound::SampleFormat::Int, 25..=32) => SampleFormat::I32,
            (hound::SampleFormat::Float, 32) => SampleFormat::F32,
            (format, bits) => {
                return Err(ClipError::UnsupportedFormat(format!(
                    "{bits}-bit {format:?} WAV data"
                )))
            }
        };
        if spec.channels == 0 {
            return Err(ClipError::UnsupportedFormat(
                "WAV header declares zero channels".into(),
            ));
        }

        let format = PcmFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_format,
        };
        let frames = u64::from(reader.duration());

        Ok(Box::new(WavStream {
            reader,
            format,
            frames,
        }))
    }
}

struct WavStream {
    reader: WavReader<Box<dyn MediaSource>>,
    format: PcmFormat,
    frames: u64,
}

impl WavStream {
    fn read_int(&mut self, buf: &mut [u8], samples: usize) -> Result<usize> {
        let width = self.format.sample_format.bytes();
        let mut written = 0;

        for sample in self.reader.samples::<i32>().take(samples) {
            let sample = sample?;
            let out = &mut buf[written..written + width];
            match self.format.sample_format {
                // hound hands 8-bit data back as signed; WAV stores it unsigned
                SampleFormat::U8 => out[0] = (sample + 128) as u8,
                SampleFormat::I16 => out.copy_from_slice(&(sample as i16).to_le_bytes()),
                SampleFormat::I24 => out.copy_from_slice(&sample.to_le_bytes()[..3]),
                SampleFormat::I32 | SampleFormat::F32 => {
                    out.copy_from_slice(&sample.to_le_bytes())
                }
            }
            written += width;
        }

        Ok(written)
    }

    fn read_float(&mut self, buf: &mut [u8], samples: usize) -> Result<usize> {
        let mut written = 0;

        for sample in self.reader.samples::<f32>().take(samples) {
            buf[written..written + 4].copy_from_slice(&sample?.to_le_bytes());
            written += 4;
        }

        Ok(written)
    }
}

impl PcmStream for WavStream {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn frame_len(&self) -> Option<u64> {
        Some(self.frames)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let frame_size = self.format.frame_size();
        let samples = (buf.len() / frame_size) * self.format.channels as usize;

        match self.format.sample_format {
            SampleFormat::F32 => self.read_float(buf, samples),
            _ => self.read_int(buf, samples),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(0)?;
        Ok(())
    }
}
