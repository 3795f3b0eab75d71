//! Real audio devices using CPAL (Cross-Platform Audio Library).
//!
//! Capture and playback handles here satisfy the blocking-read/blocking-write
//! device contract on top of CPAL's callback model: callbacks move samples
//! through a shared buffer, and `read`/`write` block on that buffer.

use crate::audio::device::{CaptureDevice, DeviceFactory, PlaybackDevice};
use crate::audio::format::AudioFormat;
use crate::audio::wav::{bytes_to_samples, samples_to_bytes};
use crate::error::{Result, TalkbackError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long `read` waits for the capture callback before returning 0 bytes.
const READ_WAIT: Duration = Duration::from_millis(100);

/// Playback queue high-water mark in samples (one second at 16kHz).
/// `write` blocks while the queue is above this, mimicking a device whose
/// buffer stopped accepting data.
const QUEUE_HIGH_WATER: usize = 16000;

/// How long `stop` waits for queued playback audio to drain.
const DRAIN_WAIT: Duration = Duration::from_secs(5);

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses ALSA/JACK/PipeWire messages that CPAL triggers while probing
/// audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` on file descriptor 2. Safe as long as no
/// other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is owned by exactly one session worker thread and is
/// only touched from that thread after construction; it never crosses thread
/// boundaries concurrently.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

fn stream_config(format: &AudioFormat) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: format.channels.count(),
        sample_rate: cpal::SampleRate(format.sample_rate_hz),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// List input and output device names visible to CPAL.
pub fn list_devices() -> Result<Vec<String>> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let mut names = Vec::new();

        let inputs = host.input_devices().map_err(|e| TalkbackError::DeviceOpen {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;
        for device in inputs {
            if let Ok(name) = device.name() {
                names.push(format!("in:  {}", name));
            }
        }

        let outputs = host
            .output_devices()
            .map_err(|e| TalkbackError::DeviceOpen {
                message: format!("Failed to enumerate output devices: {}", e),
            })?;
        for device in outputs {
            if let Ok(name) = device.name() {
                names.push(format!("out: {}", name));
            }
        }

        Ok(names)
    })
}

fn find_input_device(name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        match name {
            Some(wanted) => {
                let devices = host.input_devices().map_err(|e| TalkbackError::DeviceOpen {
                    message: format!("Failed to enumerate input devices: {}", e),
                })?;
                for device in devices {
                    if device.name().is_ok_and(|n| n == wanted) {
                        return Ok(device);
                    }
                }
                Err(TalkbackError::DeviceOpen {
                    message: format!("Input device not found: {}", wanted),
                })
            }
            None => host
                .default_input_device()
                .ok_or_else(|| TalkbackError::DeviceOpen {
                    message: "No default input device".to_string(),
                }),
        }
    })
}

fn find_output_device(name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        match name {
            Some(wanted) => {
                let devices = host
                    .output_devices()
                    .map_err(|e| TalkbackError::DeviceOpen {
                        message: format!("Failed to enumerate output devices: {}", e),
                    })?;
                for device in devices {
                    if device.name().is_ok_and(|n| n == wanted) {
                        return Ok(device);
                    }
                }
                Err(TalkbackError::DeviceOpen {
                    message: format!("Output device not found: {}", wanted),
                })
            }
            None => host
                .default_output_device()
                .ok_or_else(|| TalkbackError::DeviceOpen {
                    message: "No default output device".to_string(),
                }),
        }
    })
}

/// Capture device over a CPAL input stream.
///
/// The stream callback appends little-endian PCM bytes to a shared buffer;
/// `read` drains it, waiting up to [`READ_WAIT`] when the buffer is empty.
pub struct CpalCaptureDevice {
    device: cpal::Device,
    stream: Option<SendableStream>,
    buffer: Arc<Mutex<VecDeque<u8>>>,
    config: cpal::StreamConfig,
}

impl CpalCaptureDevice {
    pub fn open(device_name: Option<&str>, format: &AudioFormat) -> Result<Self> {
        let device = find_input_device(device_name)?;
        Ok(Self {
            device,
            stream: None,
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            config: stream_config(format),
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let err_callback = |err| {
            eprintln!("talkback: capture stream error: {}", err);
        };

        // i16 path first; PipeWire/PulseAudio convert to it transparently
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &self.config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(samples_to_bytes(data));
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // f32 fallback for devices that only expose float formats
        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(samples_to_bytes(&converted));
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| TalkbackError::DeviceOpen {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl CaptureDevice for CpalCaptureDevice {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = with_suppressed_stderr(|| self.build_stream())?;
        stream.play().map_err(|e| TalkbackError::DeviceIo {
            message: format!("Failed to start capture stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let deadline = Instant::now() + READ_WAIT;
        loop {
            {
                let mut queued = self.buffer.lock().map_err(|e| TalkbackError::DeviceIo {
                    message: format!("Capture buffer poisoned: {}", e),
                })?;
                if !queued.is_empty() {
                    let n = queued.len().min(buf.len());
                    for slot in buf.iter_mut().take(n) {
                        *slot = queued.pop_front().unwrap_or(0);
                    }
                    return Ok(n);
                }
            }
            if Instant::now() >= deadline {
                return Ok(0);
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.0.pause().map_err(|e| TalkbackError::DeviceIo {
                message: format!("Failed to stop capture stream: {}", e),
            })?;
        }
        Ok(())
    }
}

/// Playback device over a CPAL output stream.
///
/// `write` pushes samples onto a shared queue that the output callback
/// drains; it blocks while the queue is above [`QUEUE_HIGH_WATER`], giving
/// the blocking-write semantics sessions rely on for prompt cancellation.
pub struct CpalPlaybackDevice {
    device: cpal::Device,
    stream: Option<SendableStream>,
    queue: Arc<Mutex<VecDeque<i16>>>,
    config: cpal::StreamConfig,
}

impl CpalPlaybackDevice {
    pub fn open(device_name: Option<&str>, format: &AudioFormat) -> Result<Self> {
        let device = find_output_device(device_name)?;
        Ok(Self {
            device,
            stream: None,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            config: stream_config(format),
        })
    }

    fn queue_len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl PlaybackDevice for CpalPlaybackDevice {
    fn play(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let queue = Arc::clone(&self.queue);
        let stream = with_suppressed_stderr(|| {
            self.device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        let mut queued = match queue.lock() {
                            Ok(q) => q,
                            Err(_) => {
                                data.fill(0);
                                return;
                            }
                        };
                        for slot in data.iter_mut() {
                            *slot = queued.pop_front().unwrap_or(0);
                        }
                    },
                    |err| {
                        eprintln!("talkback: playback stream error: {}", err);
                    },
                    None,
                )
                .map_err(|e| TalkbackError::DeviceOpen {
                    message: format!("Failed to build output stream: {}", e),
                })
        })?;

        stream.play().map_err(|e| TalkbackError::DeviceIo {
            message: format!("Failed to start playback stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        // Block until the queue has room, like a device buffer that stopped
        // accepting data.
        while self.queue_len() > QUEUE_HIGH_WATER {
            thread::sleep(Duration::from_millis(10));
        }

        let samples = bytes_to_samples(buf);
        {
            let mut queued = self.queue.lock().map_err(|e| TalkbackError::DeviceIo {
                message: format!("Playback queue poisoned: {}", e),
            })?;
            queued.extend(samples);
        }
        Ok(buf.len())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.0.pause().map_err(|e| TalkbackError::DeviceIo {
                message: format!("Failed to pause playback stream: {}", e),
            })?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Ok(mut queued) = self.queue.lock() {
            queued.clear();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // Drain: wait for the callback to play out what was written
        let deadline = Instant::now() + DRAIN_WAIT;
        while self.queue_len() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if let Some(stream) = self.stream.take() {
            stream.0.pause().map_err(|e| TalkbackError::DeviceIo {
                message: format!("Failed to stop playback stream: {}", e),
            })?;
        }
        Ok(())
    }
}

/// Device factory backed by CPAL, optionally pinned to named devices.
pub struct CpalDeviceFactory {
    input_name: Option<String>,
    output_name: Option<String>,
}

impl CpalDeviceFactory {
    pub fn new(input_name: Option<String>, output_name: Option<String>) -> Self {
        Self {
            input_name,
            output_name,
        }
    }
}

impl DeviceFactory for CpalDeviceFactory {
    fn open_capture(&self, format: &AudioFormat) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(CpalCaptureDevice::open(
            self.input_name.as_deref(),
            format,
        )?))
    }

    fn open_playback(&self, format: &AudioFormat) -> Result<Box<dyn PlaybackDevice>> {
        Ok(Box::new(CpalPlaybackDevice::open(
            self.output_name.as_deref(),
            format,
        )?))
    }
}
