//! Recognition event surface.
//!
//! Hypotheses and errors flow out of recognition sessions through a
//! [`RecognitionEventSink`]; the presentation layer decides what to do with
//! them. Sinks are shared across threads, so handlers take `&self`.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;

/// One observed recognition event, as a sink sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "text", rename_all = "snake_case")]
pub enum RecognitionEvent {
    Partial(String),
    Final(String),
    Error(String),
}

/// Consumer of recognition results, the crate's outward callback surface.
pub trait RecognitionEventSink: Send + Sync {
    /// A revisable hypothesis for the current utterance.
    fn on_partial(&self, text: &str);

    /// A committed hypothesis; also emitted once on flush, possibly empty.
    fn on_final(&self, text: &str);

    /// A session-terminating error.
    fn on_error(&self, message: &str);
}

/// Sink that accumulates events in memory, for tests and batch consumers.
#[derive(Debug, Default)]
pub struct CollectorSink {
    events: Mutex<Vec<RecognitionEvent>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events observed so far, in order.
    pub fn events(&self) -> Vec<RecognitionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Only the final hypotheses, in order.
    pub fn finals(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecognitionEvent::Final(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Only the error messages, in order.
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecognitionEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: RecognitionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl RecognitionEventSink for CollectorSink {
    fn on_partial(&self, text: &str) {
        self.push(RecognitionEvent::Partial(text.to_string()));
    }

    fn on_final(&self, text: &str) {
        self.push(RecognitionEvent::Final(text.to_string()));
    }

    fn on_error(&self, message: &str) {
        self.push(RecognitionEvent::Error(message.to_string()));
    }
}

/// Sink that prints events to stderr, the default for interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl RecognitionEventSink for StderrSink {
    fn on_partial(&self, text: &str) {
        if !text.is_empty() {
            eprintln!("... {}", text);
        }
    }

    fn on_final(&self, text: &str) {
        if !text.is_empty() {
            eprintln!("{}", text);
        }
    }

    fn on_error(&self, message: &str) {
        eprintln!("talkback: recognition error: {}", message);
    }
}

/// Sink that writes each event as one JSON line to stdout, for scripting.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLineSink;

impl JsonLineSink {
    fn emit(&self, event: &RecognitionEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if writeln!(stdout, "{}", line).is_err() {
                    // stdout gone (broken pipe); nothing sensible to do
                }
            }
            Err(e) => eprintln!("talkback: failed to serialize event: {}", e),
        }
    }
}

impl RecognitionEventSink for JsonLineSink {
    fn on_partial(&self, text: &str) {
        self.emit(&RecognitionEvent::Partial(text.to_string()));
    }

    fn on_final(&self, text: &str) {
        self.emit(&RecognitionEvent::Final(text.to_string()));
    }

    fn on_error(&self, message: &str) {
        self.emit(&RecognitionEvent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_preserves_event_order() {
        let sink = CollectorSink::new();
        sink.on_partial("he");
        sink.on_partial("hello");
        sink.on_final("hello world");
        sink.on_error("oops");

        assert_eq!(
            sink.events(),
            vec![
                RecognitionEvent::Partial("he".to_string()),
                RecognitionEvent::Partial("hello".to_string()),
                RecognitionEvent::Final("hello world".to_string()),
                RecognitionEvent::Error("oops".to_string()),
            ]
        );
    }

    #[test]
    fn collector_filters_finals_and_errors() {
        let sink = CollectorSink::new();
        sink.on_partial("x");
        sink.on_final("one");
        sink.on_final("two");
        sink.on_error("bad");

        assert_eq!(sink.finals(), vec!["one".to_string(), "two".to_string()]);
        assert_eq!(sink.errors(), vec!["bad".to_string()]);
    }

    #[test]
    fn collector_is_usable_from_multiple_threads() {
        use std::sync::Arc;

        let sink = Arc::new(CollectorSink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || sink.on_final(&format!("t{}", i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.finals().len(), 4);
    }

    #[test]
    fn event_json_shape() {
        let json = serde_json::to_string(&RecognitionEvent::Final("done".to_string())).unwrap();
        assert_eq!(json, r#"{"event":"final","text":"done"}"#);
    }
}
