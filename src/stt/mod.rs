//! Speech-to-text: recognizer traits, model loading, and the Vosk backend.

pub mod model;
pub mod recognizer;
#[cfg(feature = "vosk-engine")]
pub mod vosk;

pub use model::ModelLoader;
pub use recognizer::{Hypothesis, Recognizer, RecognizerEngine};
