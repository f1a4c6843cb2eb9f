//! End-to-end tests for the streamed clip worker
//!
//! Each test writes a real WAV file, runs the clip's worker on its own thread
//! and inspects what reached a recording sink.

mod common;

use clipstream::clip::ClipOptions;
use clipstream::{
    Backend, ClipError, ClipTask, Decoder, MediaSource, PcmFormat, PcmStream, Playable,
    PlayableState, Result, SampleFormat, StreamedClip, LOOP_FOREVER,
};
use common::{one_second, pcm_bytes, write_wav, RecordingSinks, TIMEOUT};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RATE: u32 = 8000;

fn spawn_run(clip: &Arc<StreamedClip>) -> JoinHandle<()> {
    let clip = Arc::clone(clip);
    thread::spawn(move || clip.run())
}

fn clip_with(
    path: std::path::PathBuf,
    sinks: &Arc<RecordingSinks>,
    options: ClipOptions,
) -> Arc<StreamedClip> {
    Arc::new(StreamedClip::with_options(path, Backend::wav(sinks.clone()), options).unwrap())
}

/// Slot letting a write hook reach the clip without keeping it alive
fn clip_slot() -> Arc<Mutex<Weak<StreamedClip>>> {
    Arc::new(Mutex::new(Weak::new()))
}

/// Serves fixed 16-bit mono PCM and holds the first end-of-stream read until
/// the test releases it
struct GatedDecoder {
    pcm: Vec<u8>,
    at_end: Sender<()>,
    release: Receiver<()>,
}

impl Decoder for GatedDecoder {
    fn open(&self, _source: Box<dyn MediaSource>) -> Result<Box<dyn PcmStream>> {
        Ok(Box::new(GatedStream {
            pcm: self.pcm.clone(),
            pos: 0,
            gate: Some((self.at_end.clone(), self.release.clone())),
        }))
    }
}

struct GatedStream {
    pcm: Vec<u8>,
    pos: usize,
    gate: Option<(Sender<()>, Receiver<()>)>,
}

impl PcmStream for GatedStream {
    fn format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: RATE,
            channels: 1,
            sample_format: SampleFormat::I16,
        }
    }

    fn frame_len(&self) -> Option<u64> {
        Some(self.pcm.len() as u64 / 2)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = &self.pcm[self.pos..];
        if remaining.is_empty() {
            if let Some((at_end, release)) = self.gate.take() {
                at_end.send(()).unwrap();
                release.recv_timeout(TIMEOUT).unwrap();
            }
            return Ok(0);
        }
        let len = remaining.len().min(buf.len() - buf.len() % 2);
        buf[..len].copy_from_slice(&remaining[..len]);
        self.pos += len;
        Ok(len)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

#[test]
fn test_three_loops_then_finished() {
    let dir = tempfile::tempdir().unwrap();
    let samples = one_second(RATE);
    let path = write_wav(dir.path(), "tone.wav", &samples, RATE);
    let sinks = RecordingSinks::new();

    let clip = clip_with(path, &sinks, ClipOptions::default().loops(3));
    assert_eq!(clip.state(), PlayableState::Initializing);

    let worker = spawn_run(&clip);
    assert!(clip.wait_until_finished_for(TIMEOUT), "clip never finished");
    worker.join().unwrap();

    let content = pcm_bytes(&samples);
    let expected: Vec<u8> = content.iter().copied().cycle().take(content.len() * 3).collect();
    let rec = &sinks.recording;
    assert_eq!(rec.data(), expected);
    assert_eq!(clip.state(), PlayableState::Finished);
    assert_eq!(clip.loops(), 0);
    assert!(!clip.is_looping());
    assert_eq!(rec.opens(), 1);
    assert_eq!(rec.closes(), 1);

    let formats = rec.formats.lock();
    assert_eq!(formats[0].sample_rate, RATE);
    assert_eq!(formats[0].channels, 1);
}

#[test]
fn test_corrupt_header_never_plays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.wav");
    std::fs::write(&path, b"RIFX\x00\x00\x00\x00garbage garbage garbage").unwrap();
    let sinks = RecordingSinks::new();

    let clip = clip_with(path, &sinks, ClipOptions::default());
    clip.run();

    assert_eq!(clip.state(), PlayableState::Finished);
    assert_eq!(sinks.recording.opens(), 0);
    assert_eq!(sinks.recording.writes(), 0);
    assert!(!clip.play());
}

#[test]
fn test_missing_file_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = RecordingSinks::new();

    let clip = clip_with(dir.path().join("absent.wav"), &sinks, ClipOptions::default());
    clip.run();

    assert!(clip.is_finished());
    assert_eq!(sinks.recording.opens(), 0);
}

#[test]
fn test_sink_unavailable_finishes_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), "tone.wav", &one_second(RATE), RATE);
    let sinks = RecordingSinks::unavailable();

    let clip = clip_with(path, &sinks, ClipOptions::default());
    clip.run();

    assert!(clip.is_finished());
    assert_eq!(sinks.recording.writes(), 0);
    assert_eq!(sinks.recording.closes(), 0);
}

#[test]
fn test_waits_paused_until_played() {
    let dir = tempfile::tempdir().unwrap();
    let samples = one_second(RATE);
    let path = write_wav(dir.path(), "tone.wav", &samples, RATE);
    let sinks = RecordingSinks::new();

    let clip = clip_with(path, &sinks, ClipOptions::default().play_when_ready(false));
    let worker = spawn_run(&clip);

    assert!(clip.wait_until_ready_for(TIMEOUT));
    assert_eq!(clip.state(), PlayableState::Paused);
    assert!(!clip.pause(), "pause is a no-op while paused");

    thread::sleep(Duration::from_millis(50));
    assert_eq!(sinks.recording.writes(), 0, "paused clip must not produce output");
    assert_eq!(sinks.recording.starts.load(std::sync::atomic::Ordering::SeqCst), 1);

    assert!(clip.play());
    assert!(clip.wait_until_finished_for(TIMEOUT));
    worker.join().unwrap();

    assert_eq!(sinks.recording.data(), pcm_bytes(&samples));
}

#[test]
fn test_stop_rewinds_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let samples = one_second(RATE);
    let path = write_wav(dir.path(), "tone.wav", &samples, RATE);
    let sinks = RecordingSinks::new();
    let options = ClipOptions {
        buffer_size: 1024,
        ..ClipOptions::default()
    };

    let clip = clip_with(path, &sinks, options);
    let slot = clip_slot();
    *slot.lock() = Arc::downgrade(&clip);

    let (stopped_tx, stopped_rx) = unbounded();
    {
        let slot = Arc::clone(&slot);
        sinks.recording.on_write(move |index| {
            if index == 0 {
                if let Some(clip) = slot.lock().upgrade() {
                    clip.stop();
                }
                stopped_tx.send(()).unwrap();
            }
        });
    }

    let worker = spawn_run(&clip);
    stopped_rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(clip.state(), PlayableState::Paused);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(sinks.recording.writes(), 1, "stopped clip must not produce output");

    assert!(clip.play());
    assert!(clip.wait_until_finished_for(TIMEOUT));
    worker.join().unwrap();

    let content = pcm_bytes(&samples);
    let mut expected = content[..1024].to_vec();
    expected.extend_from_slice(&content);
    assert_eq!(sinks.recording.data(), expected);
}

#[test]
fn test_pause_resumes_where_it_left_off() {
    let dir = tempfile::tempdir().unwrap();
    let samples = one_second(RATE);
    let path = write_wav(dir.path(), "tone.wav", &samples, RATE);
    let sinks = RecordingSinks::new();
    let options = ClipOptions {
        buffer_size: 1024,
        ..ClipOptions::default()
    };

    let clip = clip_with(path, &sinks, options);
    let slot = clip_slot();
    *slot.lock() = Arc::downgrade(&clip);

    let (paused_tx, paused_rx) = unbounded();
    {
        let slot = Arc::clone(&slot);
        sinks.recording.on_write(move |index| {
            if index == 2 {
                if let Some(clip) = slot.lock().upgrade() {
                    assert!(clip.pause());
                }
                paused_tx.send(()).unwrap();
            }
        });
    }

    let worker = spawn_run(&clip);
    paused_rx.recv_timeout(TIMEOUT).unwrap();
    assert!(clip.play());
    assert!(clip.wait_until_finished_for(TIMEOUT));
    worker.join().unwrap();

    assert_eq!(sinks.recording.data(), pcm_bytes(&samples));
}

#[test]
fn test_forever_until_loops_reassigned() {
    let dir = tempfile::tempdir().unwrap();
    // 800 frames = 1600 bytes: two writes per pass with a 1 KiB buffer
    let samples: Vec<i16> = (0..800).map(|i| i as i16).collect();
    let path = write_wav(dir.path(), "short.wav", &samples, RATE);
    let sinks = RecordingSinks::new();
    let options = ClipOptions {
        buffer_size: 1024,
        loops: LOOP_FOREVER,
        ..ClipOptions::default()
    };

    let clip = clip_with(path, &sinks, options);
    assert!(clip.is_looping());
    let slot = clip_slot();
    *slot.lock() = Arc::downgrade(&clip);
    {
        let slot = Arc::clone(&slot);
        sinks.recording.on_write(move |index| {
            // last write of the third pass
            if index == 5 {
                if let Some(clip) = slot.lock().upgrade() {
                    assert_eq!(clip.loops(), LOOP_FOREVER);
                    clip.set_loops(1).unwrap();
                }
            }
        });
    }

    let worker = spawn_run(&clip);
    assert!(clip.wait_until_finished_for(TIMEOUT));
    worker.join().unwrap();

    let content = pcm_bytes(&samples);
    assert_eq!(sinks.recording.writes(), 6);
    assert_eq!(sinks.recording.data(), content.repeat(3));
    assert_eq!(clip.loops(), 0);
}

#[test]
fn test_controls_gated_while_initializing() {
    let sinks = RecordingSinks::new();
    let clip = clip_with("unused.wav".into(), &sinks, ClipOptions::default());

    assert!(clip.is_initializing());
    assert!(!clip.play());
    assert!(!clip.pause());
    clip.stop();
    assert_eq!(clip.state(), PlayableState::Initializing);
    assert!(!clip.play_loops(2).unwrap());
    assert_eq!(clip.loops(), 2);
}

#[test]
fn test_loop_validation() {
    let sinks = RecordingSinks::new();
    let clip = clip_with("unused.wav".into(), &sinks, ClipOptions::default());

    assert!(matches!(clip.set_loops(0), Err(ClipError::InvalidArgument(_))));
    assert!(matches!(clip.set_loops(-2), Err(ClipError::InvalidArgument(_))));
    assert!(matches!(clip.play_loops(0), Err(ClipError::InvalidArgument(_))));
    assert_eq!(clip.loops(), 1);

    clip.set_loops(LOOP_FOREVER).unwrap();
    assert_eq!(clip.loops(), LOOP_FOREVER);
    assert!(clip.is_looping());

    clip.set_loops(5).unwrap();
    assert_eq!(clip.loops(), 5);

    let err = StreamedClip::with_options(
        "unused.wav",
        Backend::wav(sinks.clone()),
        ClipOptions::default().loops(0),
    )
    .unwrap_err();
    assert!(matches!(err, ClipError::InvalidArgument(_)));
}

#[test]
fn test_second_run_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), "tone.wav", &one_second(RATE), RATE);
    let sinks = RecordingSinks::new();

    let clip = clip_with(path, &sinks, ClipOptions::default());
    clip.run();
    clip.run();

    assert!(clip.is_finished());
    assert_eq!(sinks.recording.opens(), 1);
}

#[test]
fn test_buffer_floor_and_display() {
    let sinks = RecordingSinks::new();
    let options = ClipOptions {
        buffer_size: 16,
        ..ClipOptions::default()
    };
    let clip = clip_with("music/theme.wav".into(), &sinks, options);

    assert_eq!(clip.buffer_size(), 1024);
    assert!(clip.play_when_ready());
    assert_eq!(clip.to_string(), "music/theme.wav");
}

#[test]
fn test_stop_during_final_read_stays_paused() {
    let dir = tempfile::tempdir().unwrap();
    let samples: Vec<i16> = (0..800).map(|i| i as i16).collect();
    let path = write_wav(dir.path(), "gated.wav", &samples, RATE);
    let content = pcm_bytes(&samples);
    let sinks = RecordingSinks::new();

    let (at_end_tx, at_end_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    let decoder = GatedDecoder {
        pcm: content.clone(),
        at_end: at_end_tx,
        release: release_rx,
    };
    let clip = Arc::new(StreamedClip::new(
        path,
        Backend::new(Arc::new(decoder), sinks.clone()),
    ));

    let worker = spawn_run(&clip);
    at_end_rx.recv_timeout(TIMEOUT).unwrap();
    clip.stop();
    assert_eq!(clip.state(), PlayableState::Paused);
    release_tx.send(()).unwrap();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(clip.state(), PlayableState::Paused, "stopped clip must not finish");
    assert_eq!(clip.loops(), 1);
    assert_eq!(sinks.recording.writes(), 1);

    assert!(clip.play());
    assert!(clip.wait_until_finished_for(TIMEOUT));
    worker.join().unwrap();

    assert_eq!(sinks.recording.data(), content.repeat(2));
    assert_eq!(sinks.recording.opens(), 1);
}

#[test]
fn test_empty_file_ends_forever_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav(dir.path(), "silent.wav", &[], RATE);
    let sinks = RecordingSinks::new();

    let clip = clip_with(path, &sinks, ClipOptions::default().loops(LOOP_FOREVER));
    let worker = spawn_run(&clip);
    assert!(clip.wait_until_finished_for(TIMEOUT), "empty clip kept looping");
    worker.join().unwrap();

    assert_eq!(sinks.recording.writes(), 0);
    assert_eq!(sinks.recording.opens(), 1);
    assert_eq!(clip.loops(), 0);
}
