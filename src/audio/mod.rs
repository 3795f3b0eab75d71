//! Audio format, device abstractions and WAV handling.

#[cfg(feature = "cpal-audio")]
pub mod cpal_device;
pub mod device;
pub mod format;
pub mod wav;

pub use device::{CaptureDevice, DeviceFactory, PlaybackDevice};
pub use format::{AudioFormat, Channels, Encoding};
