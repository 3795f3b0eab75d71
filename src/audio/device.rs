//! Audio device traits and mock implementations.
//!
//! A device handle is owned by exactly one session for the session's
//! lifetime and is released by dropping it. Sessions always call `stop()`
//! before dropping; releasing a running device leaks platform resources on
//! some backends, so the stop-then-drop order is part of the contract.

use crate::audio::format::AudioFormat;
use crate::defaults;
use crate::error::{Result, TalkbackError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Recording-side device handle.
///
/// `read` may block until the device has data. A return of `Ok(0)` means no
/// data was available this call; implementations must not return `Ok(0)`
/// without blocking briefly first, or callers would spin.
pub trait CaptureDevice: Send {
    /// Begin delivering audio.
    fn start(&mut self) -> Result<()>;

    /// Read up to `buf.len()` bytes of PCM data. Returns the byte count.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Stop delivering audio. Must be called before the handle is dropped.
    fn stop(&mut self) -> Result<()>;

    /// Minimum frame buffer the device supports for its format.
    fn min_buffer_size(&self) -> usize {
        defaults::FRAME_BYTES
    }
}

/// Playback-side device handle.
///
/// `write` may block until the device buffer accepts the bytes. `stop`
/// drains pending audio before halting; `pause` + `flush` discards it.
pub trait PlaybackDevice: Send {
    /// Begin consuming written audio.
    fn play(&mut self) -> Result<()>;

    /// Write PCM bytes to the device. Returns the byte count accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Halt consumption without discarding buffered audio.
    fn pause(&mut self) -> Result<()>;

    /// Discard any buffered, unplayed audio.
    fn flush(&mut self) -> Result<()>;

    /// Play out buffered audio, then halt. Must precede drop on the natural
    /// end-of-stream path.
    fn stop(&mut self) -> Result<()>;

    /// Minimum frame buffer the device supports for its format.
    fn min_buffer_size(&self) -> usize {
        defaults::FRAME_BYTES
    }
}

/// Allocates fresh device handles, one per session.
///
/// The controller never reuses a handle across start/stop cycles; every
/// `start_*` call opens a new one through this factory.
pub trait DeviceFactory: Send + Sync {
    fn open_capture(&self, format: &AudioFormat) -> Result<Box<dyn CaptureDevice>>;
    fn open_playback(&self, format: &AudioFormat) -> Result<Box<dyn PlaybackDevice>>;
}

/// Observable state of a mock capture device, shared with tests.
#[derive(Debug, Default)]
pub struct CaptureProbe {
    pub started: AtomicBool,
    pub stopped: AtomicBool,
    pub released: AtomicBool,
    /// Total bytes handed out by `read`.
    pub bytes_served: AtomicUsize,
}

/// Mock capture device serving scripted bytes.
///
/// Serves the configured audio frame by frame, then returns `Ok(0)` (with a
/// short sleep, simulating a blocking device with no data) until stopped.
pub struct MockCaptureDevice {
    audio: VecDeque<u8>,
    read_limit: Option<usize>,
    transient_read_failures: u32,
    fail_every_read: bool,
    should_fail_start: bool,
    should_fail_stop: bool,
    error_message: String,
    min_buffer: usize,
    probe: Arc<CaptureProbe>,
}

impl MockCaptureDevice {
    pub fn new() -> Self {
        Self {
            audio: VecDeque::new(),
            read_limit: None,
            transient_read_failures: 0,
            fail_every_read: false,
            should_fail_start: false,
            should_fail_stop: false,
            error_message: "mock capture error".to_string(),
            min_buffer: defaults::FRAME_BYTES,
            probe: Arc::new(CaptureProbe::default()),
        }
    }

    /// Script the bytes the device will serve.
    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio.into();
        self
    }

    /// Cap how many bytes a single `read` returns (defaults to `buf.len()`).
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = Some(limit);
        self
    }

    /// Fail the first `count` reads, then serve normally.
    pub fn with_transient_read_failures(mut self, count: u32) -> Self {
        self.transient_read_failures = count;
        self
    }

    /// Fail every read (an unrecoverable device).
    pub fn with_read_failure(mut self) -> Self {
        self.fail_every_read = true;
        self
    }

    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn with_min_buffer_size(mut self, size: usize) -> Self {
        self.min_buffer = size;
        self
    }

    /// Probe handle for asserting on device state after the session owns it.
    pub fn probe(&self) -> Arc<CaptureProbe> {
        Arc::clone(&self.probe)
    }

    fn device_error(&self) -> TalkbackError {
        TalkbackError::DeviceIo {
            message: self.error_message.clone(),
        }
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(TalkbackError::DeviceOpen {
                message: self.error_message.clone(),
            });
        }
        self.probe.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.fail_every_read {
            return Err(self.device_error());
        }
        if self.transient_read_failures > 0 {
            self.transient_read_failures -= 1;
            return Err(self.device_error());
        }
        if self.audio.is_empty() {
            // Simulate a blocking device with nothing to deliver
            thread::sleep(Duration::from_millis(1));
            return Ok(0);
        }
        let want = self.read_limit.unwrap_or(buf.len()).min(buf.len());
        let n = want.min(self.audio.len());
        for slot in buf.iter_mut().take(n) {
            // audio is non-empty for the first n pops by construction
            *slot = self.audio.pop_front().unwrap_or(0);
        }
        self.probe.bytes_served.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            return Err(self.device_error());
        }
        self.probe.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn min_buffer_size(&self) -> usize {
        self.min_buffer
    }
}

impl Drop for MockCaptureDevice {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Observable state of a mock playback device, shared with tests.
#[derive(Debug, Default)]
pub struct PlaybackProbe {
    pub playing: AtomicBool,
    pub paused: AtomicBool,
    pub flushed: AtomicBool,
    pub stopped: AtomicBool,
    pub released: AtomicBool,
    pub write_calls: AtomicUsize,
    written: Mutex<Vec<u8>>,
}

impl PlaybackProbe {
    /// Every byte written to the device, in order.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

/// Mock playback device recording everything written to it.
pub struct MockPlaybackDevice {
    write_limit: Option<usize>,
    should_fail_play: bool,
    should_fail_write: bool,
    error_message: String,
    probe: Arc<PlaybackProbe>,
}

impl MockPlaybackDevice {
    pub fn new() -> Self {
        Self {
            write_limit: None,
            should_fail_play: false,
            should_fail_write: false,
            error_message: "mock playback error".to_string(),
            probe: Arc::new(PlaybackProbe::default()),
        }
    }

    /// Cap how many bytes a single `write` accepts (exercises short writes).
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn with_play_failure(mut self) -> Self {
        self.should_fail_play = true;
        self
    }

    pub fn with_write_failure(mut self) -> Self {
        self.should_fail_write = true;
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn probe(&self) -> Arc<PlaybackProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for MockPlaybackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDevice for MockPlaybackDevice {
    fn play(&mut self) -> Result<()> {
        if self.should_fail_play {
            return Err(TalkbackError::DeviceOpen {
                message: self.error_message.clone(),
            });
        }
        self.probe.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.should_fail_write {
            return Err(TalkbackError::DeviceIo {
                message: self.error_message.clone(),
            });
        }
        let n = self.write_limit.unwrap_or(buf.len()).min(buf.len());
        self.probe.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut written) = self.probe.written.lock() {
            written.extend_from_slice(&buf[..n]);
        }
        Ok(n)
    }

    fn pause(&mut self) -> Result<()> {
        self.probe.paused.store(true, Ordering::SeqCst);
        self.probe.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.probe.flushed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.probe.stopped.store(true, Ordering::SeqCst);
        self.probe.playing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockPlaybackDevice {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Mock device factory for controller tests.
///
/// Serves queued mocks first; once the queues are empty it hands out default
/// devices (endless-silence capture, byte-sink playback), so repeated
/// start/stop cycles keep working.
#[derive(Default)]
pub struct MockDeviceFactory {
    captures: Mutex<VecDeque<MockCaptureDevice>>,
    playbacks: Mutex<VecDeque<MockPlaybackDevice>>,
    pub captures_opened: AtomicUsize,
    pub playbacks_opened: AtomicUsize,
}

impl MockDeviceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_capture(&self, device: MockCaptureDevice) {
        if let Ok(mut queue) = self.captures.lock() {
            queue.push_back(device);
        }
    }

    pub fn push_playback(&self, device: MockPlaybackDevice) {
        if let Ok(mut queue) = self.playbacks.lock() {
            queue.push_back(device);
        }
    }
}

impl DeviceFactory for MockDeviceFactory {
    fn open_capture(&self, _format: &AudioFormat) -> Result<Box<dyn CaptureDevice>> {
        self.captures_opened.fetch_add(1, Ordering::SeqCst);
        let queued = self.captures.lock().ok().and_then(|mut q| q.pop_front());
        Ok(Box::new(queued.unwrap_or_default()))
    }

    fn open_playback(&self, _format: &AudioFormat) -> Result<Box<dyn PlaybackDevice>> {
        self.playbacks_opened.fetch_add(1, Ordering::SeqCst);
        let queued = self.playbacks.lock().ok().and_then(|mut q| q.pop_front());
        Ok(Box::new(queued.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_capture_serves_scripted_audio() {
        let mut device = MockCaptureDevice::new().with_audio(vec![1, 2, 3, 4, 5]);
        let mut buf = [0u8; 3];

        assert_eq!(device.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);

        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);

        // Exhausted: zero-byte reads from here on
        assert_eq!(device.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn mock_capture_read_limit_caps_single_read() {
        let mut device = MockCaptureDevice::new()
            .with_audio(vec![0u8; 100])
            .with_read_limit(10);
        let mut buf = [0u8; 64];
        assert_eq!(device.read(&mut buf).unwrap(), 10);
    }

    #[test]
    fn mock_capture_transient_failures_then_recover() {
        let mut device = MockCaptureDevice::new()
            .with_audio(vec![9u8; 4])
            .with_transient_read_failures(2);
        let mut buf = [0u8; 4];

        assert!(device.read(&mut buf).is_err());
        assert!(device.read(&mut buf).is_err());
        assert_eq!(device.read(&mut buf).unwrap(), 4);
    }

    #[test]
    fn mock_capture_start_failure_is_device_open() {
        let mut device = MockCaptureDevice::new()
            .with_start_failure()
            .with_error_message("device busy");
        match device.start() {
            Err(TalkbackError::DeviceOpen { message }) => assert_eq!(message, "device busy"),
            other => panic!("Expected DeviceOpen, got {:?}", other),
        }
    }

    #[test]
    fn mock_capture_probe_tracks_lifecycle() {
        let device = MockCaptureDevice::new().with_audio(vec![1, 2]);
        let probe = device.probe();

        let mut device = device;
        device.start().unwrap();
        assert!(probe.started.load(Ordering::SeqCst));

        let mut buf = [0u8; 2];
        device.read(&mut buf).unwrap();
        assert_eq!(probe.bytes_served.load(Ordering::SeqCst), 2);

        device.stop().unwrap();
        assert!(probe.stopped.load(Ordering::SeqCst));
        assert!(!probe.released.load(Ordering::SeqCst));

        drop(device);
        assert!(probe.released.load(Ordering::SeqCst));
    }

    #[test]
    fn mock_playback_records_writes_in_order() {
        let device = MockPlaybackDevice::new();
        let probe = device.probe();
        let mut device = device;

        device.play().unwrap();
        assert_eq!(device.write(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(device.write(&[4, 5]).unwrap(), 2);

        assert_eq!(probe.written(), vec![1, 2, 3, 4, 5]);
        assert_eq!(probe.write_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn mock_playback_write_limit_yields_short_writes() {
        let mut device = MockPlaybackDevice::new().with_write_limit(2);
        assert_eq!(device.write(&[1, 2, 3, 4]).unwrap(), 2);
    }

    #[test]
    fn mock_playback_probe_tracks_forced_stop_sequence() {
        let device = MockPlaybackDevice::new();
        let probe = device.probe();
        let mut device = device;

        device.play().unwrap();
        device.pause().unwrap();
        device.flush().unwrap();
        drop(device);

        assert!(probe.paused.load(Ordering::SeqCst));
        assert!(probe.flushed.load(Ordering::SeqCst));
        assert!(probe.released.load(Ordering::SeqCst));
        assert!(!probe.playing.load(Ordering::SeqCst));
    }

    #[test]
    fn factory_serves_queued_then_default_devices() {
        let factory = MockDeviceFactory::new();
        factory.push_capture(MockCaptureDevice::new().with_audio(vec![7u8; 8]));

        let format = AudioFormat::default();
        let mut first = factory.open_capture(&format).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(first.read(&mut buf).unwrap(), 8);
        assert_eq!(buf, [7u8; 8]);

        // Queue drained: default device serves silence (zero-byte reads)
        let mut second = factory.open_capture(&format).unwrap();
        assert_eq!(second.read(&mut buf).unwrap(), 0);
        assert_eq!(factory.captures_opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn capture_device_trait_is_object_safe() {
        let device: Box<dyn CaptureDevice> =
            Box::new(MockCaptureDevice::new().with_audio(vec![1, 2, 3]));
        let mut device = device;
        device.start().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(device.read(&mut buf).unwrap(), 3);
        device.stop().unwrap();
    }
}
