//! Session controller: the top-level coordinator.
//!
//! Owns at most one session of each kind (capture, playback, recognition) and
//! enforces the lifecycle rules between them: recording is gated on
//! microphone permission, stopping a recording hands the recorded file to a
//! recognition session, and starting a replay while one is already playing
//! stops the old run first. Every session gets a fresh device handle from the
//! factory; handles are never reused across start/stop cycles.

use crate::audio::device::DeviceFactory;
use crate::audio::format::AudioFormat;
use crate::audio::wav;
use crate::defaults;
use crate::error::{Result, TalkbackError};
use crate::events::RecognitionEventSink;
use crate::permission::MicrophonePermission;
use crate::session::{CaptureSession, PlaybackSession, StreamingRecognitionSession};
use crate::stt::RecognizerEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct SessionController {
    format: AudioFormat,
    devices: Arc<dyn DeviceFactory>,
    permission: Arc<dyn MicrophonePermission>,
    sink: Arc<dyn RecognitionEventSink>,
    engine: Option<Arc<dyn RecognizerEngine>>,
    recording_path: PathBuf,
    capture: Option<CaptureSession>,
    playback: Option<PlaybackSession>,
    recognition: Option<StreamingRecognitionSession>,
}

impl SessionController {
    pub fn new(
        format: AudioFormat,
        devices: Arc<dyn DeviceFactory>,
        permission: Arc<dyn MicrophonePermission>,
        sink: Arc<dyn RecognitionEventSink>,
        recording_path: PathBuf,
    ) -> Self {
        Self {
            format,
            devices,
            permission,
            sink,
            engine: None,
            recording_path,
            capture: None,
            playback: None,
            recognition: None,
        }
    }

    /// Install the loaded recognition engine. Until this is called the
    /// controller records and replays but cannot transcribe.
    pub fn set_engine(&mut self, engine: Arc<dyn RecognizerEngine>) {
        self.engine = Some(engine);
    }

    pub fn model_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub fn recording_path(&self) -> &Path {
        &self.recording_path
    }

    pub fn is_recording(&self) -> bool {
        self.capture.as_ref().is_some_and(CaptureSession::is_recording)
    }

    pub fn is_replaying(&self) -> bool {
        self.playback.as_ref().is_some_and(PlaybackSession::is_playing)
    }

    pub fn recognition_active(&self) -> bool {
        self.recognition
            .as_ref()
            .is_some_and(StreamingRecognitionSession::is_active)
    }

    /// Start recording to the controller's recording path.
    ///
    /// Fails with `PermissionDenied` when microphone access is not granted.
    /// A second call while already recording is a no-op, not an error.
    pub fn start_recording(&mut self) -> Result<()> {
        if !self.permission.is_granted() {
            return Err(TalkbackError::PermissionDenied);
        }
        if self.is_recording() {
            return Ok(());
        }

        if let Some(parent) = self.recording_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let device = self.devices.open_capture(&self.format)?;
        let session = CaptureSession::start(device, &self.recording_path, &self.format)?;
        self.capture = Some(session);
        Ok(())
    }

    /// Stop recording, then toggle recognition.
    ///
    /// If a recognition session is currently streaming, the stop ends it
    /// instead of starting another one. Otherwise the freshly recorded file
    /// is fed to a new recognition session; its hypotheses arrive at the
    /// event sink.
    ///
    /// # Returns
    /// Bytes recorded, or 0 when nothing was recording.
    pub fn stop_recording(&mut self) -> Result<u64> {
        let Some(mut session) = self.capture.take() else {
            return Ok(0);
        };
        let bytes = session.stop()?;

        if self.recognition_active() {
            self.stop_recognition()?;
            return Ok(bytes);
        }

        let engine = self
            .engine
            .as_ref()
            .ok_or(TalkbackError::ModelNotReady)?;
        let recognizer = engine.create_recognizer(self.format.sample_rate_hz)?;
        let source = wav::open_pcm_source(&self.recording_path)?;
        self.recognition = Some(StreamingRecognitionSession::start(
            recognizer,
            source,
            Arc::clone(&self.sink),
            defaults::RECOGNIZER_CHUNK_BYTES,
        )?);

        Ok(bytes)
    }

    /// Replay the recorded file through a fresh playback device.
    ///
    /// A replay that is still playing is stopped first, so this always starts
    /// from the beginning of the file.
    pub fn start_replay(&mut self) -> Result<()> {
        if let Some(mut session) = self.playback.take() {
            session.stop()?;
        }

        let device = self.devices.open_playback(&self.format)?;
        let session = PlaybackSession::start(device, &self.recording_path, &self.format)?;
        self.playback = Some(session);
        Ok(())
    }

    /// Stop an active replay, discarding buffered audio. No-op when idle.
    pub fn stop_replay(&mut self) -> Result<()> {
        if let Some(mut session) = self.playback.take() {
            session.stop()?;
        }
        Ok(())
    }

    /// Transcribe an arbitrary file without touching the recording path.
    ///
    /// Parseable WAV files are decoded (stereo mixed down, other rates
    /// resampled to 16 kHz); anything else is fed as raw PCM.
    pub fn start_recognition_of(&mut self, path: &Path) -> Result<()> {
        self.stop_recognition()?;

        let engine = self
            .engine
            .as_ref()
            .ok_or(TalkbackError::ModelNotReady)?;
        let recognizer = engine.create_recognizer(self.format.sample_rate_hz)?;
        let source: Box<dyn std::io::Read + Send> = match wav::decode_wav(path) {
            Ok(samples) => Box::new(std::io::Cursor::new(wav::samples_to_bytes(&samples))),
            Err(_) => wav::open_pcm_source(path)?,
        };
        self.recognition = Some(StreamingRecognitionSession::start(
            recognizer,
            source,
            Arc::clone(&self.sink),
            defaults::RECOGNIZER_CHUNK_BYTES,
        )?);
        Ok(())
    }

    /// End an active recognition session. The final flush hypothesis is
    /// still emitted before this returns. No-op when idle.
    pub fn stop_recognition(&mut self) -> Result<()> {
        if let Some(mut session) = self.recognition.take() {
            session.stop()?;
        }
        Ok(())
    }

    /// Stop everything that is still running. First failure wins; later
    /// sessions are still stopped.
    pub fn shutdown(&mut self) -> Result<()> {
        let capture = match self.capture.take() {
            Some(mut session) => session.stop().map(|_| ()),
            None => Ok(()),
        };
        let playback = match self.playback.take() {
            Some(mut session) => session.stop().map(|_| ()),
            None => Ok(()),
        };
        let recognition = match self.recognition.take() {
            Some(mut session) => session.stop(),
            None => Ok(()),
        };
        capture?;
        playback?;
        recognition
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            eprintln!("talkback: shutdown: {}", e);
        }
    }
}
