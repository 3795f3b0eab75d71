//! Bounded-lifetime sessions: capture, playback and recognition feed.
//!
//! Each session owns its device or stream exclusively, runs its loop on a
//! dedicated worker thread, and is cancelled cooperatively through an atomic
//! stop flag checked at iteration boundaries. Stopping a session joins the
//! worker, so the device handle is fully released before `stop` returns.

pub mod capture;
pub mod playback;
pub mod recognition;

pub use capture::CaptureSession;
pub use playback::{PlaybackOutcome, PlaybackSession};
pub use recognition::StreamingRecognitionSession;

use std::fmt;

/// Lifecycle of a capture or playback session.
///
/// `Running` means Recording for capture and Playing for playback. `Stopped`
/// is terminal; session objects are discarded after reaching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}
