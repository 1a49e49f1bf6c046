//! # warden-audit
//!
//! Everything Warden lets the outside world observe.
//!
//! Each operation produces zero or more [`AccessEvent`]s. They are fanned out
//! to [`NotificationSink`]s through an [`EventDispatcher`] (wrapped in an
//! [`EventEnvelope`] with a fresh id) and recorded, per operation, as a
//! [`JournalEntry`] in a SHA-256 hash-chained [`Journal`].
//!
//! ## Key invariants
//!
//! - **Deterministic journal**: entries hash only operation payloads, never
//!   envelope ids, so replaying the same operations yields the same head hash.
//! - **Tamper-evident export**: [`Journal::verify_file`] rejects any edited,
//!   inserted or dropped line.
//! - **Sinks never fail an operation**: dispatch errors are logged and dropped.

pub mod amount;
pub mod error;
pub mod event;
pub mod hasher;
pub mod journal;
pub mod sink;

pub use error::AuditError;
pub use event::{AccessEvent, EventEnvelope};
pub use journal::{Journal, JournalEntry};
pub use sink::{EventDispatcher, LogSink, MemorySink, NotificationSink};
