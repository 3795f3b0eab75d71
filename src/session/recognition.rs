//! Streaming recognition session: feeds a recorded byte stream to a
//! recognizer and surfaces hypotheses through an event sink.

use crate::error::{Result, TalkbackError};
use crate::events::RecognitionEventSink;
use crate::stt::recognizer::{Hypothesis, Recognizer};
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// One pass of recorded audio through a recognizer, on its own thread.
///
/// The session owns its source stream and recognizer; the engine the
/// recognizer came from is shared and outlives the session. Exhausting the
/// source and `stop()` both end with a final flush emission, after which the
/// session is Finished.
pub struct StreamingRecognitionSession {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl StreamingRecognitionSession {
    /// Start feeding `source` to `recognizer` in `chunk_bytes`-sized chunks.
    pub fn start(
        mut recognizer: Box<dyn Recognizer>,
        mut source: Box<dyn Read + Send>,
        sink: Arc<dyn RecognitionEventSink>,
        chunk_bytes: usize,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name("talkback-recognize".to_string())
            .spawn(move || {
                run_feed_loop(
                    recognizer.as_mut(),
                    source.as_mut(),
                    sink.as_ref(),
                    &stop_flag,
                    chunk_bytes,
                );
            })?;

        Ok(Self {
            stop,
            worker: Some(worker),
            finished: false,
        })
    }

    /// End the feed early, discarding any unread remainder.
    ///
    /// The final flush hypothesis is still emitted before the worker exits;
    /// this call joins it. No-op once Finished.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.stop.store(true, Ordering::SeqCst);
        self.finished = true;
        worker.join().map_err(TalkbackError::from_panic)?;
        Ok(())
    }

    /// True while the feed loop is live; turns false on its own once the
    /// source is exhausted and the flush has been emitted.
    pub fn is_active(&self) -> bool {
        !self.finished && self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl Drop for StreamingRecognitionSession {
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

/// Feed chunks until EOF, an error or the stop flag, then flush.
///
/// Source and recognizer errors are emitted through the sink and end the
/// session without a flush (the decoder state is suspect after a failure).
fn run_feed_loop(
    recognizer: &mut dyn Recognizer,
    source: &mut dyn Read,
    sink: &dyn RecognitionEventSink,
    stop: &AtomicBool,
    chunk_bytes: usize,
) {
    let mut chunk = vec![0u8; chunk_bytes];

    while !stop.load(Ordering::SeqCst) {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                sink.on_error(&format!("source read failed: {}", e));
                return;
            }
        };

        match recognizer.accept_chunk(&chunk[..n]) {
            Ok(Hypothesis::Partial(text)) => sink.on_partial(&text),
            Ok(Hypothesis::Final(text)) => sink.on_final(&text),
            Err(e) => {
                sink.on_error(&e.to_string());
                return;
            }
        }
    }

    // Same closing emission for exhaustion and early stop
    match recognizer.flush() {
        Ok(text) => sink.on_final(&text),
        Err(e) => sink.on_error(&e.to_string()),
    }
}
