//! Asynchronous model loading.
//!
//! Loading a recognition model involves heavy I/O, so it runs on a worker
//! thread while the caller stays responsive. The outcome arrives as a
//! two-state completion signal: ready with a shared engine, or failed with
//! an error. There is no retry; a failed load is terminal and the caller
//! starts over.

use crate::error::{Result, TalkbackError};
use crate::stt::recognizer::RecognizerEngine;
use crossbeam_channel::{Receiver, bounded};
use std::sync::Arc;
use std::thread;

/// In-flight model load.
pub struct ModelLoader {
    rx: Receiver<Result<Arc<dyn RecognizerEngine>>>,
}

impl ModelLoader {
    /// Run `load` on a background thread.
    pub fn spawn<F>(load: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn RecognizerEngine>> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        // Detached worker; the result channel is the only link back
        let _ = thread::Builder::new()
            .name("talkback-model-load".to_string())
            .spawn(move || {
                let outcome = load();
                let _ = tx.send(outcome);
            });
        Self { rx }
    }

    /// Non-blocking poll. `None` while the load is still running.
    pub fn try_ready(&self) -> Option<Result<Arc<dyn RecognizerEngine>>> {
        self.rx.try_recv().ok()
    }

    /// Block until the load completes.
    pub fn wait(self) -> Result<Arc<dyn RecognizerEngine>> {
        self.rx
            .recv()
            .map_err(|_| TalkbackError::ModelLoad {
                message: "model loading thread exited without a result".to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::recognizer::{MockEngine, MockRecognizer};
    use std::time::Duration;

    fn mock_engine() -> Arc<dyn RecognizerEngine> {
        Arc::new(MockEngine::new(MockRecognizer::new()))
    }

    #[test]
    fn wait_returns_loaded_engine() {
        let loader = ModelLoader::spawn(|| Ok(mock_engine()));
        let engine = loader.wait().unwrap();
        assert_eq!(engine.name(), "mock-model");
    }

    #[test]
    fn wait_propagates_load_failure() {
        let loader = ModelLoader::spawn(|| {
            Err(TalkbackError::ModelLoad {
                message: "model directory missing".to_string(),
            })
        });
        assert!(matches!(
            loader.wait(),
            Err(TalkbackError::ModelLoad { .. })
        ));
    }

    #[test]
    fn try_ready_is_none_while_loading() {
        let loader = ModelLoader::spawn(|| {
            thread::sleep(Duration::from_millis(200));
            Ok(mock_engine())
        });
        // Immediately after spawn the slow load cannot have finished
        assert!(loader.try_ready().is_none());
        assert!(loader.wait().is_ok());
    }

    #[test]
    fn try_ready_yields_result_once() {
        let loader = ModelLoader::spawn(|| Ok(mock_engine()));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = loader.try_ready() {
                assert!(outcome.is_ok());
                break;
            }
            assert!(std::time::Instant::now() < deadline, "load never completed");
            thread::sleep(Duration::from_millis(5));
        }

        // Already consumed
        assert!(loader.try_ready().is_none());
    }
}
