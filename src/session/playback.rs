//! Playback session: source file read loop writing to a device.

use crate::audio::device::PlaybackDevice;
use crate::audio::format::AudioFormat;
use crate::error::{Result, TalkbackError};
use crate::session::SessionState;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// How a playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOutcome {
    /// Chunks written to the device, ceil(source_len / frame_len) on a full
    /// natural run.
    pub chunks_played: u64,
    /// True when the source was exhausted, false on a forced stop.
    pub reached_end: bool,
}

/// A single replay run: source file → device, on its own thread.
///
/// Natural end-of-file drains the device before releasing it; a forced stop
/// pauses and flushes instead, dropping any unplayed buffered audio. Both
/// paths leave the handle fully released.
pub struct PlaybackSession {
    state: SessionState,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<PlaybackOutcome>>>,
    outcome: Option<PlaybackOutcome>,
}

impl PlaybackSession {
    /// Start replaying `source_path`.
    ///
    /// Source open failures and device play failures surface synchronously.
    pub fn start(
        mut device: Box<dyn PlaybackDevice>,
        source_path: &Path,
        format: &AudioFormat,
    ) -> Result<Self> {
        let file = File::open(source_path)?;
        device.play()?;

        let frame_len = format.frame_buffer_size(device.min_buffer_size());
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name("talkback-playback".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(file);
                let result =
                    run_playback_loop(device.as_mut(), &mut reader, &stop_flag, frame_len);

                // Natural end: drain buffered audio, then halt. Forced stop
                // or error: pause and discard. The handle is released by the
                // drop below in every case.
                match &result {
                    Ok(outcome) if outcome.reached_end => {
                        if let Err(e) = device.stop() {
                            eprintln!("talkback: playback device stop failed: {}", e);
                        }
                    }
                    _ => {
                        if let Err(e) = device.pause() {
                            eprintln!("talkback: playback device pause failed: {}", e);
                        }
                        if let Err(e) = device.flush() {
                            eprintln!("talkback: playback device flush failed: {}", e);
                        }
                    }
                }
                drop(device);

                result
            })?;

        Ok(Self {
            state: SessionState::Running,
            stop,
            worker: Some(worker),
            outcome: None,
        })
    }

    /// Signal the loop to stop and wait for the worker to exit.
    ///
    /// Blocks for at most one device write's playback duration. Idempotent:
    /// repeated calls return the first outcome. If the source was already
    /// exhausted this just collects the natural outcome.
    pub fn stop(&mut self) -> Result<PlaybackOutcome> {
        let Some(worker) = self.worker.take() else {
            return Ok(self.outcome.unwrap_or(PlaybackOutcome {
                chunks_played: 0,
                reached_end: false,
            }));
        };

        self.stop.store(true, Ordering::SeqCst);
        self.state = SessionState::Stopped;

        let outcome = worker.join().map_err(TalkbackError::from_panic)??;
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while the worker loop is live; turns false on its own when the
    /// source is exhausted.
    pub fn is_playing(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.stop.store(true, Ordering::SeqCst);
            if let Err(payload) = worker.join() {
                let e = TalkbackError::from_panic(payload);
                eprintln!("talkback: {}", e);
            }
        }
    }
}

/// Write source chunks to the device until EOF or the stop flag.
///
/// The flag is re-checked after every write: a blocking write completes
/// before the flag is observed, so cancellation latency is bounded by one
/// frame's playback duration. Short device writes are retried until the
/// whole chunk is accepted.
fn run_playback_loop(
    device: &mut dyn PlaybackDevice,
    source: &mut impl Read,
    stop: &AtomicBool,
    frame_len: usize,
) -> Result<PlaybackOutcome> {
    let mut frame = vec![0u8; frame_len];
    let mut chunks_played = 0u64;

    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(PlaybackOutcome {
                chunks_played,
                reached_end: false,
            });
        }

        let n = source.read(&mut frame)?;
        if n == 0 {
            return Ok(PlaybackOutcome {
                chunks_played,
                reached_end: true,
            });
        }

        let mut offset = 0;
        while offset < n {
            let accepted = device.write(&frame[offset..n])?;
            if accepted == 0 {
                return Err(TalkbackError::DeviceIo {
                    message: "playback device accepted 0 bytes".to_string(),
                });
            }
            offset += accepted;
        }
        chunks_played += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::MockPlaybackDevice;
    use crate::defaults;
    use std::time::{Duration, Instant};

    fn wait_until_finished(session: &PlaybackSession) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.is_playing() {
            assert!(Instant::now() < deadline, "playback did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn session_over(
        bytes: &[u8],
        device: MockPlaybackDevice,
    ) -> (PlaybackSession, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.pcm");
        std::fs::write(&path, bytes).unwrap();
        let session =
            PlaybackSession::start(Box::new(device), &path, &AudioFormat::default()).unwrap();
        (session, dir)
    }

    #[test]
    fn plays_whole_file_in_ceil_chunks() {
        // 2.5 frames worth of data → 3 chunks, short last chunk
        let source: Vec<u8> = (0..=255)
            .cycle()
            .take(defaults::FRAME_BYTES * 2 + defaults::FRAME_BYTES / 2)
            .collect();
        let device = MockPlaybackDevice::new();
        let probe = device.probe();

        let (mut session, _dir) = session_over(&source, device);
        wait_until_finished(&session);
        let outcome = session.stop().unwrap();

        assert!(outcome.reached_end);
        assert_eq!(outcome.chunks_played, 3);
        assert_eq!(probe.written(), source);
        assert!(probe.stopped.load(Ordering::SeqCst));
        assert!(probe.released.load(Ordering::SeqCst));
        // Natural end drains, it does not discard
        assert!(!probe.flushed.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_file_terminates_without_any_write() {
        let device = MockPlaybackDevice::new();
        let probe = device.probe();

        let (mut session, _dir) = session_over(&[], device);
        wait_until_finished(&session);
        let outcome = session.stop().unwrap();

        assert!(outcome.reached_end);
        assert_eq!(outcome.chunks_played, 0);
        assert_eq!(probe.write_calls.load(Ordering::SeqCst), 0);
        assert!(probe.released.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn short_device_writes_are_retried_to_completion() {
        let source = vec![7u8; defaults::FRAME_BYTES];
        let device = MockPlaybackDevice::new().with_write_limit(100);
        let probe = device.probe();

        let (mut session, _dir) = session_over(&source, device);
        wait_until_finished(&session);
        session.stop().unwrap();

        assert_eq!(probe.written(), source);
    }

    #[test]
    fn forced_stop_pauses_and_flushes() {
        // Endless-ish source so the loop is still running when we stop
        let source = vec![1u8; defaults::FRAME_BYTES * 64];
        let device = MockPlaybackDevice::new();
        let probe = device.probe();

        let (mut session, _dir) = session_over(&source, device);
        let outcome = session.stop().unwrap();

        if !outcome.reached_end {
            assert!(probe.paused.load(Ordering::SeqCst));
            assert!(probe.flushed.load(Ordering::SeqCst));
        }
        assert!(probe.released.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn stop_twice_is_a_no_op() {
        let (mut session, _dir) = session_over(&[], MockPlaybackDevice::new());
        wait_until_finished(&session);

        let first = session.stop().unwrap();
        let second = session.stop().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_source_fails_synchronously() {
        let device = MockPlaybackDevice::new();
        let result = PlaybackSession::start(
            Box::new(device),
            Path::new("/no/such/file.pcm"),
            &AudioFormat::default(),
        );
        assert!(matches!(result, Err(TalkbackError::Io(_))));
    }

    #[test]
    fn play_failure_surfaces_synchronously() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.pcm");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let device = MockPlaybackDevice::new().with_play_failure();
        let result = PlaybackSession::start(Box::new(device), &path, &AudioFormat::default());
        assert!(matches!(result, Err(TalkbackError::DeviceOpen { .. })));
    }

    #[test]
    fn write_failure_ends_session_discarding_buffered_audio() {
        let source = vec![0u8; defaults::FRAME_BYTES * 4];
        let device = MockPlaybackDevice::new().with_write_failure();
        let probe = device.probe();

        let (mut session, _dir) = session_over(&source, device);
        wait_until_finished(&session);

        let result = session.stop();
        assert!(matches!(result, Err(TalkbackError::DeviceIo { .. })));
        assert!(probe.paused.load(Ordering::SeqCst));
        assert!(probe.flushed.load(Ordering::SeqCst));
        assert!(probe.released.load(Ordering::SeqCst));
    }
}
