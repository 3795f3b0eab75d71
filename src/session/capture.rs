//! Capture session: device read loop writing to a sink file.

use crate::audio::device::CaptureDevice;
use crate::audio::format::AudioFormat;
use crate::defaults;
use crate::error::{Result, TalkbackError};
use crate::session::SessionState;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A single recording run: device → sink file, on its own thread.
///
/// The device handle moves into the worker thread and is owned there for the
/// session's lifetime. `stop` signals the loop, joins the worker and only
/// returns once the device has been stopped and released, so a subsequent
/// session can reopen the same logical device immediately.
pub struct CaptureSession {
    state: SessionState,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<u64>>>,
    sink_path: PathBuf,
    bytes_written: u64,
}

impl CaptureSession {
    /// Start recording to `sink_path`.
    ///
    /// The sink file is created and the device started before the worker is
    /// spawned, so open failures surface synchronously as errors here rather
    /// than later from the loop.
    pub fn start(
        mut device: Box<dyn CaptureDevice>,
        sink_path: &Path,
        format: &AudioFormat,
    ) -> Result<Self> {
        let file = File::create(sink_path)?;
        device.start()?;

        let frame_len = format.frame_buffer_size(device.min_buffer_size());
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name("talkback-capture".to_string())
            .spawn(move || {
                let mut writer = BufWriter::new(file);
                let result = run_capture_loop(device.as_mut(), &mut writer, &stop_flag, frame_len);

                // Release sequence runs on every exit path: stop the device,
                // drop the handle, flush the sink.
                if let Err(e) = device.stop() {
                    eprintln!("talkback: capture device stop failed: {}", e);
                }
                drop(device);

                let flush_result = writer.flush();
                match result {
                    Ok(bytes) => {
                        flush_result?;
                        Ok(bytes)
                    }
                    Err(e) => Err(e),
                }
            })?;

        Ok(Self {
            state: SessionState::Running,
            stop,
            worker: Some(worker),
            sink_path: sink_path.to_path_buf(),
            bytes_written: 0,
        })
    }

    /// Signal the loop to stop and wait for the worker to exit.
    ///
    /// Blocks for at most one device read plus file I/O. Idempotent: calling
    /// again after the session is Stopped returns the recorded byte count.
    ///
    /// # Returns
    /// Total bytes written to the sink file.
    pub fn stop(&mut self) -> Result<u64> {
        let Some(worker) = self.worker.take() else {
            return Ok(self.bytes_written);
        };

        self.stop.store(true, Ordering::SeqCst);
        self.state = SessionState::Stopped;

        let bytes = worker.join().map_err(TalkbackError::from_panic)??;
        self.bytes_written = bytes;
        Ok(bytes)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while the worker loop is live. The loop only exits on a stop
    /// signal or a fatal error, so this normally stays true until `stop`.
    pub fn is_recording(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn sink_path(&self) -> &Path {
        &self.sink_path
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Best-effort shutdown if the owner never called stop
        if let Some(worker) = self.worker.take() {
            self.stop.store(true, Ordering::SeqCst);
            if let Err(payload) = worker.join() {
                let e = TalkbackError::from_panic(payload);
                eprintln!("talkback: {}", e);
            }
        }
    }
}

/// Read frames until the stop flag is observed.
///
/// Transient read errors are logged and the loop continues; after
/// [`defaults::MAX_CONSECUTIVE_READ_ERRORS`] consecutive failures the device
/// is treated as unrecoverable and the loop exits with the error. Zero-byte
/// reads never terminate the loop (the device contract says they block
/// briefly first). Because the flag is checked at iteration boundaries, up
/// to one extra read's worth of audio may land in the sink after stop is
/// requested.
fn run_capture_loop(
    device: &mut dyn CaptureDevice,
    sink: &mut impl Write,
    stop: &AtomicBool,
    frame_len: usize,
) -> Result<u64> {
    let mut frame = vec![0u8; frame_len];
    let mut written = 0u64;
    let mut consecutive_errors = 0u32;

    while !stop.load(Ordering::SeqCst) {
        match device.read(&mut frame) {
            Ok(0) => continue,
            Ok(n) => {
                consecutive_errors = 0;
                sink.write_all(&frame[..n])?;
                written += n as u64;
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= defaults::MAX_CONSECUTIVE_READ_ERRORS {
                    return Err(TalkbackError::DeviceIo {
                        message: format!(
                            "{} consecutive read failures, last: {}",
                            consecutive_errors, e
                        ),
                    });
                }
                eprintln!("talkback: transient capture read error: {}", e);
                thread::sleep(Duration::from_millis(defaults::READ_ERROR_BACKOFF_MS));
            }
        }
    }

    Ok(written)
}
