//! Audio format description and frame buffer sizing.

use crate::defaults;
use std::time::Duration;

/// Channel layout. Only mono is supported; the recognizer expects it and
/// capture/playback are configured to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
}

impl Channels {
    pub fn count(self) -> u16 {
        match self {
            Channels::Mono => 1,
        }
    }
}

/// Sample encoding. Devices and files all carry little-endian PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Pcm,
}

/// The audio format shared by every session of one controller.
///
/// All sessions created by a [`crate::controller::SessionController`] use the
/// same format, so a file written by a capture session can be consumed by a
/// playback or recognition session without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub channels: Channels,
    pub bits_per_sample: u16,
    pub encoding: Encoding,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::SAMPLE_RATE,
            channels: Channels::Mono,
            bits_per_sample: defaults::BITS_PER_SAMPLE,
            encoding: Encoding::Pcm,
        }
    }
}

impl AudioFormat {
    /// Bytes of PCM data per second of audio.
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate_hz * self.channels.count() as u32 * (self.bits_per_sample as u32 / 8)
    }

    /// Frame buffer length for session loops.
    ///
    /// At least [`defaults::FRAME_BYTES`], but never below the minimum the
    /// device reports for this format.
    pub fn frame_buffer_size(&self, device_min: usize) -> usize {
        defaults::FRAME_BYTES.max(device_min)
    }

    /// Playback duration of `bytes` of PCM data in this format.
    pub fn duration_of(&self, bytes: u64) -> Duration {
        let secs = bytes as f64 / self.bytes_per_second() as f64;
        Duration::from_secs_f64(secs)
    }
}
