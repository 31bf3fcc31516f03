//! Structured event stream for `trafficlight`.
//!
//! Discrete, typed events emitted as the signal cycles. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number for ordering.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::phase::{DeliveryOrder, Phase};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during `trafficlight` operation.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The timing loop has started.
    ControllerStarted {
        /// When the loop started.
        timestamp: DateTime<Utc>,
        /// Phase at start (always red for a fresh controller).
        phase: Phase,
        /// Shortest possible phase, in milliseconds.
        min_cycle_ms: u64,
        /// Longest possible phase, in milliseconds.
        max_cycle_ms: u64,
        /// Channel removal policy.
        order: DeliveryOrder,
    },

    /// The signal toggled and the new phase was published.
    PhaseChanged {
        /// When the toggle happened.
        timestamp: DateTime<Utc>,
        /// Phase that was left.
        from: Phase,
        /// Phase that was entered.
        to: Phase,
        /// One-based toggle counter.
        toggle: u64,
        /// Duration drawn for the phase just entered.
        next_cycle_ms: u64,
    },

    /// An observer's wait for a phase was satisfied.
    ObserverReleased {
        /// When the observer woke.
        timestamp: DateTime<Utc>,
        /// Observer identifier assigned by the driver.
        observer: u32,
        /// Phase the observer was waiting for.
        phase: Phase,
        /// Time spent blocked, in milliseconds.
        waited_ms: u64,
    },

    /// The timing loop has stopped and its thread was joined.
    ControllerStopped {
        /// When the controller stopped.
        timestamp: DateTime<Utc>,
        /// Total toggles performed.
        toggles: u64,
        /// Phase at shutdown.
        phase: Phase,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) takes the next sequence number,
/// serializes the event as a single JSON line, and flushes the underlying
/// writer. Serialization or I/O failures are dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        // Sequence is assigned under the writer lock so lines stay ordered.
        let mut w = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };
        if let Ok(line) = serde_json::to_string(&envelope) {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_event() -> Event {
        Event::PhaseChanged {
            timestamp: DateTime::parse_from_rfc3339("2025-02-04T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            from: Phase::Red,
            to: Phase::Green,
            toggle: 1,
            next_cycle_ms: 4500,
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "PhaseChanged");
        assert_eq!(parsed["from"], "red");
        assert_eq!(parsed["to"], "green");
    }

    #[test]
    fn emitter_writes_valid_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_event());

        let output = tw.contents();
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["type"], "PhaseChanged");
        assert_eq!(parsed["next_cycle_ms"], 4500);
        assert_eq!(parsed["sequence"], 0);
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_event());
        emitter.emit(Event::ControllerStopped {
            timestamp: Utc::now(),
            toggles: 1,
            phase: Phase::Green,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["type"], "ControllerStopped");
    }

    #[test]
    fn emitter_keeps_writing_after_poisoned_lock() {
        let tw = TestWriter::new();
        let emitter = Arc::new(EventEmitter::new(Box::new(tw.clone())));

        let poisoner = Arc::clone(&emitter);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.writer.lock().unwrap();
            panic!("writer panicked mid-emit");
        })
        .join();
        assert!(result.is_err());
        assert!(emitter.writer.is_poisoned());

        emitter.emit(sample_event());
        emitter.emit(sample_event());

        assert_eq!(emitter.event_count(), 2);
        assert_eq!(tw.contents().lines().count(), 2);
    }

    #[test]
    fn all_event_variants_serialize_to_valid_json() {
        let now = Utc::now();
        let variants = vec![
            Event::ControllerStarted {
                timestamp: now,
                phase: Phase::Red,
                min_cycle_ms: 4000,
                max_cycle_ms: 6000,
                order: DeliveryOrder::Lifo,
            },
            sample_event(),
            Event::ObserverReleased {
                timestamp: now,
                observer: 3,
                phase: Phase::Green,
                waited_ms: 1234,
            },
            Event::ControllerStopped {
                timestamp: now,
                toggles: 9,
                phase: Phase::Red,
            },
        ];

        for event in variants {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert!(parsed.get("type").is_some(), "missing type tag: {json}");
            assert!(parsed.get("timestamp").is_some(), "missing timestamp: {json}");
        }
    }

    #[test]
    fn noop_emitter_counts_events() {
        let emitter = EventEmitter::noop();
        emitter.emit(sample_event());
        assert_eq!(emitter.event_count(), 1);
    }

    #[test]
    fn file_emitter_writes_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.jsonl");
        let emitter = EventEmitter::from_file(&path).unwrap();
        emitter.emit(sample_event());
        drop(emitter);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
