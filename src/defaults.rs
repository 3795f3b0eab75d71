//! Default configuration constants for talkback.
//!
//! Shared constants used across sessions and configuration types to keep
//! capture, playback and recognition in agreement about the audio format.

/// Audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and is the only rate the
/// recognizer is constructed with; capture and playback use the same rate so
/// recorded files can be replayed and recognized without conversion.
pub const SAMPLE_RATE: u32 = 16000;

/// Bits per sample for PCM audio.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Frame buffer length in bytes for the capture and playback loops.
///
/// 1024 bytes is 512 samples, i.e. 32ms at 16kHz mono 16-bit. Small enough
/// that a stop request is observed within tens of milliseconds, large enough
/// to keep per-iteration overhead negligible.
pub const FRAME_BYTES: usize = 1024;

/// Chunk length in bytes fed to the recognizer per iteration.
///
/// Larger than the device frame: the recognizer amortizes better over
/// quarter-second chunks, and feed latency is not user-visible.
pub const RECOGNIZER_CHUNK_BYTES: usize = 8192;

/// Size of a canonical WAV (RIFF) header.
///
/// Recorded files are raw PCM, but pre-recorded assets may carry a RIFF
/// header that must be skipped before feeding samples to the recognizer.
pub const WAV_HEADER_BYTES: usize = 44;

/// File name of the well-known recording target under the data directory.
pub const RECORDING_FILE_NAME: &str = "recording.wav";

/// Consecutive device read failures tolerated before a capture session
/// treats the device as unrecoverable and shuts down.
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 8;

/// Backoff after a transient device read failure, so a flaky device does not
/// turn the capture loop into a busy-fail spin.
pub const READ_ERROR_BACKOFF_MS: u64 = 5;
