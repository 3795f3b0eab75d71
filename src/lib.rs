//! talkback - Record, replay and transcribe microphone audio
//!
//! Captures raw PCM from a microphone to a file, replays it, and streams it
//! through a speech recognizer that emits partial and final hypotheses.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod defaults;
pub mod error;
pub mod events;
pub mod permission;
pub mod session;
pub mod stt;

// Core traits (device → session → sink)
pub use audio::device::{CaptureDevice, DeviceFactory, PlaybackDevice};
pub use audio::format::AudioFormat;
pub use events::{RecognitionEvent, RecognitionEventSink};
pub use permission::MicrophonePermission;
pub use stt::recognizer::{Hypothesis, Recognizer, RecognizerEngine};

// Coordinator
pub use controller::SessionController;
pub use session::{CaptureSession, PlaybackSession, SessionState, StreamingRecognitionSession};

// Error handling
pub use error::{Result, TalkbackError};

// Config
pub use config::Config;
