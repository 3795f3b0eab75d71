//! Error types for talkback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalkbackError {
    // Permission gate
    #[error("Microphone permission denied")]
    PermissionDenied,

    // Audio device errors
    #[error("Failed to open audio device: {message}")]
    DeviceOpen { message: String },

    #[error("Audio device I/O failed: {message}")]
    DeviceIo { message: String },

    // Recognition errors
    #[error("Failed to load recognizer model: {message}")]
    ModelLoad { message: String },

    #[error("Recognizer model is not loaded yet")]
    ModelNotReady,

    #[error("Recognizer failed: {message}")]
    Recognizer { message: String },

    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors (sink/source files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Worker thread panicked; carries whatever payload the panic had
    #[error("Session thread panicked: {message}")]
    SessionPanicked { message: String },

    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TalkbackError>;

impl TalkbackError {
    /// Build a `SessionPanicked` error from a `JoinHandle::join` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        TalkbackError::SessionPanicked { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn permission_denied_display() {
        let error = TalkbackError::PermissionDenied;
        assert_eq!(error.to_string(), "Microphone permission denied");
    }

    #[test]
    fn device_open_display() {
        let error = TalkbackError::DeviceOpen {
            message: "no input device".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to open audio device: no input device"
        );
    }

    #[test]
    fn device_io_display() {
        let error = TalkbackError::DeviceIo {
            message: "read timed out".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device I/O failed: read timed out");
    }

    #[test]
    fn model_load_display() {
        let error = TalkbackError::ModelLoad {
            message: "model directory missing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to load recognizer model: model directory missing"
        );
    }

    #[test]
    fn recognizer_display() {
        let error = TalkbackError::Recognizer {
            message: "decoder rejected waveform".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Recognizer failed: decoder rejected waveform"
        );
    }

    #[test]
    fn from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: TalkbackError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("a = b = c").unwrap_err();
        let error: TalkbackError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn from_panic_str_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        match TalkbackError::from_panic(payload) {
            TalkbackError::SessionPanicked { message } => assert_eq!(message, "boom"),
            other => panic!("Expected SessionPanicked, got {:?}", other),
        }
    }

    #[test]
    fn from_panic_string_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("ouch".to_string());
        match TalkbackError::from_panic(payload) {
            TalkbackError::SessionPanicked { message } => assert_eq!(message, "ouch"),
            other => panic!("Expected SessionPanicked, got {:?}", other),
        }
    }

    #[test]
    fn from_panic_opaque_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        match TalkbackError::from_panic(payload) {
            TalkbackError::SessionPanicked { message } => assert_eq!(message, "unknown panic"),
            other => panic!("Expected SessionPanicked, got {:?}", other),
        }
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<TalkbackError>();
        assert_sync::<TalkbackError>();
    }

    #[test]
    fn result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(returns_result().unwrap(), 7);
    }
}
