//! Mutex-guarded state cell shared by a clip's worker and its controllers.
//!
//! Every transition is a short critical section that implements one row of
//! the gating table in [`crate::playable`], followed by a condvar
//! notification so waiters (the worker, `wait_until_*` callers) wake up.

use crate::playable::{validate_loops, PlayableState, LOOP_FOREVER};
use crate::Result;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct ControlCell {
    state: PlayableState,
    loops: i32,
    /// Set by `stop()` and loop restarts; consumed by the worker before its next read
    rewind_pending: bool,
}

/// What the worker should do after waiting for `Playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resume {
    /// Keep reading; rewind the decoder first if `rewind` is set
    Read { rewind: bool },
    /// The clip is already finished. The worker only finalizes after leaving
    /// its loop, so this guards against a caller outside that loop.
    Finished,
}

#[derive(Debug)]
pub(crate) struct ClipControl {
    cell: Mutex<ControlCell>,
    changed: Condvar,
}

impl ClipControl {
    pub(crate) fn new(loops: i32) -> Self {
        ClipControl {
            cell: Mutex::new(ControlCell {
                state: PlayableState::Initializing,
                loops,
                rewind_pending: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> PlayableState {
        self.cell.lock().state
    }

    pub(crate) fn loops(&self) -> i32 {
        self.cell.lock().loops
    }

    pub(crate) fn play(&self) -> bool {
        let mut cell = self.cell.lock();
        self.play_locked(&mut cell)
    }

    pub(crate) fn play_loops(&self, loops: i32) -> Result<bool> {
        let loops = validate_loops(loops)?;
        let mut cell = self.cell.lock();
        cell.loops = loops;
        Ok(self.play_locked(&mut cell))
    }

    pub(crate) fn pause(&self) -> bool {
        let mut cell = self.cell.lock();
        self.pause_locked(&mut cell)
    }

    /// Pause, and schedule a rewind if the pause took effect
    pub(crate) fn stop(&self) -> bool {
        let mut cell = self.cell.lock();
        if !self.pause_locked(&mut cell) {
            return false;
        }
        cell.rewind_pending = true;
        true
    }

    pub(crate) fn set_loops(&self, loops: i32) -> Result<()> {
        let loops = validate_loops(loops)?;
        self.cell.lock().loops = loops;
        Ok(())
    }

    /// Initialization done: `Initializing` → `Paused`, then optionally play
    pub(crate) fn mark_ready(&self, play_when_ready: bool) {
        let mut cell = self.cell.lock();
        if cell.state != PlayableState::Initializing {
            return;
        }
        self.transition(&mut cell, PlayableState::Paused);
        if play_when_ready {
            self.play_locked(&mut cell);
        }
    }

    /// Block while paused; returns once the clip is playing (or finished)
    pub(crate) fn await_playing(&self) -> Resume {
        let mut cell = self.cell.lock();
        loop {
            match cell.state {
                PlayableState::Playing => {
                    let rewind = std::mem::take(&mut cell.rewind_pending);
                    return Resume::Read { rewind };
                }
                PlayableState::Finished => return Resume::Finished,
                PlayableState::Initializing | PlayableState::Paused => {
                    self.changed.wait(&mut cell);
                }
            }
        }
    }

    /// Loop boundary bookkeeping at end of stream.
    ///
    /// Returns `true` if another iteration should play. The internal
    /// stop-then-play leaves a playing clip playing and schedules a rewind.
    /// A pass stopped before it ran out does not count, and an `empty` pass
    /// (no frames since the last rewind) always ends the clip.
    pub(crate) fn end_of_stream(&self, empty: bool) -> bool {
        let mut cell = self.cell.lock();
        if cell.rewind_pending {
            return true;
        }
        if empty {
            cell.loops = 0;
            return false;
        }
        match cell.loops {
            LOOP_FOREVER => {}
            n if n > 1 => cell.loops -= 1,
            _ => {
                cell.loops = 0;
                return false;
            }
        }
        cell.rewind_pending = true;
        true
    }

    /// Terminal transition, from any state
    pub(crate) fn finish(&self) {
        let mut cell = self.cell.lock();
        self.transition(&mut cell, PlayableState::Finished);
    }

    /// Wait until `done(state)` holds, or until `timeout` elapses.
    ///
    /// Returns the state observed last.
    pub(crate) fn wait_for(
        &self,
        timeout: Option<Duration>,
        done: impl Fn(PlayableState) -> bool,
    ) -> PlayableState {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut cell = self.cell.lock();
        while !done(cell.state) {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut cell, deadline).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut cell),
            }
        }
        cell.state
    }

    fn play_locked(&self, cell: &mut MutexGuard<'_, ControlCell>) -> bool {
        if cell.state != PlayableState::Paused {
            return false;
        }
        self.transition(cell, PlayableState::Playing);
        true
    }

    fn pause_locked(&self, cell: &mut MutexGuard<'_, ControlCell>) -> bool {
        if cell.state != PlayableState::Playing {
            return false;
        }
        self.transition(cell, PlayableState::Paused);
        true
    }

    fn transition(&self, cell: &mut MutexGuard<'_, ControlCell>, to: PlayableState) {
        tracing::trace!(from = ?cell.state, to = ?to, "clip state");
        cell.state = to;
        self.changed.notify_all();
    }
}
