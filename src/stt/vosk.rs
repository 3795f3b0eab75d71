//! Vosk-based recognition engine.
//!
//! # Feature Gate
//!
//! Requires the `vosk-engine` feature and the libvosk dynamic library at
//! link time:
//!
//! ```bash
//! cargo build --features vosk-engine
//! ```

use crate::audio::wav::bytes_to_samples;
use crate::error::{Result, TalkbackError};
use crate::stt::recognizer::{Hypothesis, Recognizer, RecognizerEngine};
use std::path::Path;

/// A loaded Vosk model. Read-only; any number of recognizers can be created
/// from it concurrently.
pub struct VoskEngine {
    model: vosk::Model,
    name: String,
}

impl VoskEngine {
    /// Load a model from an unpacked model directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_dir.display().to_string());

        let model = vosk::Model::new(model_dir.to_string_lossy().as_ref()).ok_or_else(|| {
            TalkbackError::ModelLoad {
                message: format!("failed to load model from {}", model_dir.display()),
            }
        })?;

        Ok(Self { model, name })
    }
}

impl RecognizerEngine for VoskEngine {
    fn create_recognizer(&self, sample_rate_hz: u32) -> Result<Box<dyn Recognizer>> {
        let inner =
            vosk::Recognizer::new(&self.model, sample_rate_hz as f32).ok_or_else(|| {
                TalkbackError::Recognizer {
                    message: format!(
                        "failed to create recognizer at {} Hz for model {}",
                        sample_rate_hz, self.name
                    ),
                }
            })?;
        Ok(Box::new(VoskRecognizer { inner }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct VoskRecognizer {
    inner: vosk::Recognizer,
}

impl Recognizer for VoskRecognizer {
    fn accept_chunk(&mut self, pcm: &[u8]) -> Result<Hypothesis> {
        let samples = bytes_to_samples(pcm);
        match self.inner.accept_waveform(&samples) {
            Ok(vosk::DecodingState::Finalized) => {
                // Utterance boundary: the decoder committed a result
                let text = self
                    .inner
                    .result()
                    .single()
                    .map(|r| r.text.to_string())
                    .unwrap_or_default();
                Ok(Hypothesis::Final(text))
            }
            Ok(vosk::DecodingState::Running) => {
                let text = self.inner.partial_result().partial.to_string();
                Ok(Hypothesis::Partial(text))
            }
            Ok(vosk::DecodingState::Failed) => Err(TalkbackError::Recognizer {
                message: "decoder entered failed state".to_string(),
            }),
            Err(e) => Err(TalkbackError::Recognizer {
                message: format!("accept_waveform rejected chunk: {:?}", e),
            }),
        }
    }

    fn flush(&mut self) -> Result<String> {
        Ok(self
            .inner
            .final_result()
            .single()
            .map(|r| r.text.to_string())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_missing_directory_fails() {
        let result = VoskEngine::load(Path::new("/no/such/model-dir"));
        assert!(matches!(result, Err(TalkbackError::ModelLoad { .. })));
    }
}
