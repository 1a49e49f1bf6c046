// sink.rs — Notification sinks and the dispatcher that feeds them.
//
// Sinks observe events after an operation commits. They can fail (a full
// disk, a closed pipe) but a sink failure never rolls back or rejects the
// operation that produced the event: the dispatcher logs and moves on.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::AuditError;
use crate::event::{AccessEvent, EventEnvelope};

/// Receives every event Warden emits.
pub trait NotificationSink: Send {
    /// Handle one event. Errors are logged by the dispatcher, not propagated.
    fn send(&self, envelope: &EventEnvelope) -> Result<(), AuditError>;
}

/// Appends envelopes as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for LogSink {
    fn send(&self, envelope: &EventEnvelope) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| AuditError::OpenFailed {
                path: self.path.clone(),
                source,
            })?;

        let json = serde_json::to_string(envelope)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Keeps envelopes in memory. Clones share the same buffer, so a test (or
/// the CLI) can hold one handle while the dispatcher owns another.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        self.lock().clone()
    }

    /// Just the events, in emission order.
    pub fn events(&self) -> Vec<AccessEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EventEnvelope>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSink for MemorySink {
    fn send(&self, envelope: &EventEnvelope) -> Result<(), AuditError> {
        self.lock().push(envelope.clone());
        Ok(())
    }
}

/// Fans events out to every registered sink.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Wrap `event` in a fresh envelope and deliver it to all sinks.
    pub fn dispatch(&self, event: &AccessEvent, emitted_at: DateTime<Utc>) {
        if self.sinks.is_empty() {
            return;
        }
        let envelope = EventEnvelope::new(event.clone(), emitted_at);
        for sink in &self.sinks {
            if let Err(e) = sink.send(&envelope) {
                tracing::warn!(event_type = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn granted(id: u64) -> AccessEvent {
        AccessEvent::AccessGranted {
            id,
            requester: "alice".to_string(),
        }
    }

    #[test]
    fn log_sink_appends_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");
        let sink = LogSink::new(&path);

        sink.send(&EventEnvelope::new(granted(0), Utc::now())).unwrap();
        sink.send(&EventEnvelope::new(granted(1), Utc::now())).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"access_granted\""));
    }

    #[test]
    fn dispatcher_sends_to_all_sinks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sink.jsonl");
        let memory = MemorySink::new();

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(LogSink::new(&path)));
        dispatcher.add_sink(Box::new(memory.clone()));
        assert_eq!(dispatcher.sink_count(), 2);

        dispatcher.dispatch(&granted(7), Utc::now());

        assert!(fs::read_to_string(&path).unwrap().contains("access_granted"));
        assert_eq!(memory.events(), vec![granted(7)]);
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        struct Broken;
        impl NotificationSink for Broken {
            fn send(&self, _: &EventEnvelope) -> Result<(), AuditError> {
                Err(AuditError::WriteFailed(std::io::Error::other("disk full")))
            }
        }

        let memory = MemorySink::new();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(Broken));
        dispatcher.add_sink(Box::new(memory.clone()));

        dispatcher.dispatch(&granted(1), Utc::now());
        assert_eq!(memory.events().len(), 1);
    }

    #[test]
    fn envelopes_get_distinct_ids() {
        let memory = MemorySink::new();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(memory.clone()));

        dispatcher.dispatch(&granted(1), Utc::now());
        dispatcher.dispatch(&granted(1), Utc::now());

        let envelopes = memory.envelopes();
        assert_ne!(envelopes[0].event_id, envelopes[1].event_id);
        memory.clear();
        assert!(memory.events().is_empty());
    }
}
