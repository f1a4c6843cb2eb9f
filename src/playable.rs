//! Playback control contract.
//!
//! A [`Playable`] owns a [`PlayableState`] and only moves between states
//! through its control methods. Every mutating call is gated by the current
//! state:
//!
//! | call      | from        | to        |
//! |-----------|-------------|-----------|
//! | `play()`  | `Paused`    | `Playing` |
//! | `pause()` | `Playing`   | `Paused`  |
//! | `stop()`  | `Playing`   | `Paused` (position reset to start) |
//!
//! Any other combination is a no-op. Nothing leaves `Finished`.

use crate::{ClipError, Result};

/// Loop count meaning "repeat until the process ends".
pub const LOOP_FOREVER: i32 = -1;

/// Lifecycle of a playable clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayableState {
    /// Resources are still being loaded; cannot be played, paused or stopped.
    #[default]
    Initializing,
    /// Ready, head not moving.
    Paused,
    /// Head moving, output being produced.
    Playing,
    /// Terminal; the head can no longer move.
    Finished,
}

/// Playback controls shared by anything clip-like.
///
/// All methods take `&self`: implementors are shared between the worker
/// thread and any number of controlling threads.
pub trait Playable {
    /// Start playing if and only if the current state is `Paused`.
    ///
    /// Returns `true` if this call moved the clip to `Playing`.
    fn play(&self) -> bool;

    /// Set the loop count, then [`play`](Playable::play).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `loops` is neither ≥ 1 nor [`LOOP_FOREVER`]; the
    /// clip is left untouched in that case.
    fn play_loops(&self, loops: i32) -> Result<bool>;

    /// Pause if and only if the current state is `Playing`.
    ///
    /// Returns `true` if this call moved the clip to `Paused`.
    fn pause(&self) -> bool;

    /// Pause and reset the head to the start if currently playing.
    fn stop(&self);

    /// Number of iterations to play before finishing.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `loops` is neither ≥ 1 nor [`LOOP_FOREVER`].
    fn set_loops(&self, loops: i32) -> Result<()>;

    /// Iterations remaining before the clip may finish.
    fn loops(&self) -> i32;

    /// Current state.
    fn state(&self) -> PlayableState;

    /// Whether resources are still loading.
    fn is_initializing(&self) -> bool {
        self.state() == PlayableState::Initializing
    }

    /// Whether the head is moving.
    fn is_playing(&self) -> bool {
        self.state() == PlayableState::Playing
    }

    /// Whether the clip reached its terminal state.
    fn is_finished(&self) -> bool {
        self.state() == PlayableState::Finished
    }

    /// Whether the clip repeats when the head reaches the end.
    fn is_looping(&self) -> bool {
        is_looping(self.loops())
    }
}

/// A [`Playable`] that also carries the routine driving its playback.
///
/// [`AudioManager`](crate::AudioManager) schedules `run` on a pool thread.
pub trait ClipTask: Playable + Send + Sync {
    /// Drive playback until the clip is finished.
    fn run(&self);
}

/// `true` for [`LOOP_FOREVER`] and any nonzero count.
pub fn is_looping(loops: i32) -> bool {
    loops == LOOP_FOREVER || loops != 0
}

/// Check a loop count supplied by a caller.
pub fn validate_loops(loops: i32) -> Result<i32> {
    if loops < 1 && loops != LOOP_FOREVER {
        return Err(ClipError::InvalidArgument(format!(
            "loops must be > 0 or {LOOP_FOREVER}, got {loops}"
        )));
    }
    Ok(loops)
}
