//! Recognizer traits and mock implementations.

use crate::error::{Result, TalkbackError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A transcription candidate emitted by the recognizer.
///
/// Partial hypotheses are revisable; a final hypothesis is committed for its
/// utterance (the recognizer detects utterance boundaries internally).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Hypothesis {
    Partial(String),
    Final(String),
}

/// Streaming speech recognizer bound to one audio stream.
///
/// Created per recognition session; not shared. The engine it came from
/// outlives it.
pub trait Recognizer: Send {
    /// Feed a chunk of 16-bit little-endian PCM and get the current
    /// hypothesis back.
    fn accept_chunk(&mut self, pcm: &[u8]) -> Result<Hypothesis>;

    /// Flush decoder state and return the last final hypothesis, possibly
    /// empty when nothing (or only silence) was fed.
    fn flush(&mut self) -> Result<String>;
}

/// A loaded recognition model.
///
/// Read-only and shareable: any number of concurrent recognizers may be
/// created from one engine, which is why implementations must be `Sync`.
/// Held as `Arc<dyn RecognizerEngine>` for the application's lifetime.
pub trait RecognizerEngine: Send + Sync {
    /// Create a recognizer for a stream at the given sample rate.
    fn create_recognizer(&self, sample_rate_hz: u32) -> Result<Box<dyn Recognizer>>;

    /// Model name for diagnostics.
    fn name(&self) -> &str;
}

/// Mock recognizer emitting scripted hypotheses.
///
/// Serves one scripted hypothesis per chunk; once the script runs out every
/// further chunk yields an empty partial.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    script: VecDeque<Hypothesis>,
    flush_text: String,
    should_fail_accept: bool,
    should_fail_flush: bool,
    chunks_accepted: Arc<AtomicUsize>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            flush_text: String::new(),
            should_fail_accept: false,
            should_fail_flush: false,
            chunks_accepted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the hypotheses returned by successive `accept_chunk` calls.
    pub fn with_script(mut self, script: Vec<Hypothesis>) -> Self {
        self.script = script.into();
        self
    }

    /// Set the text `flush` returns.
    pub fn with_flush_text(mut self, text: &str) -> Self {
        self.flush_text = text.to_string();
        self
    }

    pub fn with_accept_failure(mut self) -> Self {
        self.should_fail_accept = true;
        self
    }

    pub fn with_flush_failure(mut self) -> Self {
        self.should_fail_flush = true;
        self
    }

    /// Shared counter of chunks accepted, for asserting after the recognizer
    /// moves into a session.
    pub fn chunk_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.chunks_accepted)
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for MockRecognizer {
    fn accept_chunk(&mut self, _pcm: &[u8]) -> Result<Hypothesis> {
        if self.should_fail_accept {
            return Err(TalkbackError::Recognizer {
                message: "mock recognizer failure".to_string(),
            });
        }
        self.chunks_accepted.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| Hypothesis::Partial(String::new())))
    }

    fn flush(&mut self) -> Result<String> {
        if self.should_fail_flush {
            return Err(TalkbackError::Recognizer {
                message: "mock flush failure".to_string(),
            });
        }
        Ok(self.flush_text.clone())
    }
}

/// Mock engine producing clones of a template recognizer.
pub struct MockEngine {
    template: MockRecognizer,
    name: String,
    recognizers_created: AtomicUsize,
}

impl MockEngine {
    pub fn new(template: MockRecognizer) -> Self {
        Self {
            template,
            name: "mock-model".to_string(),
            recognizers_created: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn recognizers_created(&self) -> usize {
        self.recognizers_created.load(Ordering::SeqCst)
    }
}

impl RecognizerEngine for MockEngine {
    fn create_recognizer(&self, _sample_rate_hz: u32) -> Result<Box<dyn Recognizer>> {
        self.recognizers_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.template.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
