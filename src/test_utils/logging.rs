//! Capture of `tracing` events emitted while a closure runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Captures beyond this many events keep only the most recent ones.
const MAX_ENTRIES: usize = 1000;

/// One `tracing` event as seen by [`capture_logs`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Recorded value of a non-message field, formatted with `Debug`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Sink = Arc<Mutex<VecDeque<LogEntry>>>;

struct CaptureLayer {
    sink: Sink,
}

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        struct MessageVisitor<'a> {
            message: &'a mut String,
            fields: &'a mut Vec<(String, String)>,
        }

        impl tracing::field::Visit for MessageVisitor<'_> {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    *self.message = value.to_string();
                } else {
                    self.fields
                        .push((field.name().to_string(), value.to_string()));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let value_str = format!("{value:?}");
                if field.name() == "message" {
                    *self.message = value_str;
                } else {
                    self.fields.push((field.name().to_string(), value_str));
                }
            }
        }

        let metadata = event.metadata();
        let mut entry = LogEntry {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: String::new(),
            fields: Vec::new(),
        };
        let mut visitor = MessageVisitor {
            message: &mut entry.message,
            fields: &mut entry.fields,
        };
        event.record(&mut visitor);

        if let Ok(mut sink) = self.sink.lock() {
            if sink.len() == MAX_ENTRIES {
                sink.pop_front();
            }
            sink.push_back(entry);
        }
    }
}

/// Run `f` with a thread-local subscriber that captures events at `level` and
/// above, returning its result with everything captured.
pub fn capture_logs<R>(level: Level, f: impl FnOnce() -> R) -> (R, Vec<LogEntry>) {
    let sink = Sink::default();
    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(CaptureLayer {
            sink: Arc::clone(&sink),
        });

    let result = tracing::subscriber::with_default(subscriber, f);

    let entries = sink
        .lock()
        .map(|mut sink| sink.drain(..).collect())
        .unwrap_or_default();
    (result, entries)
}

/// Format entries for display in an assertion message.
#[must_use]
pub fn format_logs_for_display(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return String::from("No logs captured");
    }

    let mut output = format!("Captured {} log entries:\n", entries.len());
    for entry in entries {
        output.push_str(&format!(
            "[{}] {}: {}\n",
            entry.level, entry.target, entry.message
        ));
        for (key, value) in &entry.fields {
            output.push_str(&format!("    {key} = {value}\n"));
        }
    }
    output
}

/// Assert that `entries` hold an event at `level` whose message contains `message`.
#[macro_export]
macro_rules! assert_log_contains {
    ($entries:expr, $level:expr, $message:expr) => {{
        let entries: &[$crate::test_utils::logging::LogEntry] = &$entries;
        let found = entries
            .iter()
            .any(|e| e.level == $level && e.message.contains($message));
        assert!(
            found,
            "Expected log with level {} containing '{}'\n{}",
            $level,
            $message,
            $crate::test_utils::logging::format_logs_for_display(entries)
        );
    }};
}
