//! Real-time audio output through rodio
//!
//! Decoded PCM is converted to f32 and pushed into a [`RingBuffer`] that a
//! rodio `Source` drains on the audio thread. Memory usage is limited to the
//! ring buffer size.

pub mod audio_device;
pub mod ring_buffer;

pub use audio_device::{AudioDevice, RodioSinkProvider};
pub use ring_buffer::RingBuffer;

/// Buffer backoff time in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 500;

/// Smallest ring buffer latency, whatever the configured buffer size
pub const MIN_LATENCY_MS: u32 = 50;

/// Samples pulled from the ring buffer per batch on the audio thread
pub const SOURCE_BATCH: usize = 512;
