// reputation.rs — Per-principal blocking windows and benign streaks.
//
// Status is never stored. A principal is Suspicious exactly while
// `now < blocking_end`; once the window passes, the next read sees Benign
// with no reset step. Records are created lazily on first activity and
// removed only when the principal is revoked.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Benign,
    Suspicious,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Benign => f.write_str("benign"),
            Status::Suspicious => f.write_str("suspicious"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    /// Last benign access. Misbehavior does not move it.
    pub last_activity: Option<DateTime<Utc>>,
    pub blocking_end: Option<DateTime<Utc>>,
    pub benign_streak_start: Option<DateTime<Utc>>,
    /// When the principal was last flagged.
    pub last_flagged_at: Option<DateTime<Utc>>,
}

impl ReputationRecord {
    pub fn status(&self, now: DateTime<Utc>) -> Status {
        match self.blocking_end {
            Some(end) if now < end => Status::Suspicious,
            _ => Status::Benign,
        }
    }

    /// When the derived status last changed: the flag time while blocked,
    /// the window's end once it has passed.
    pub fn last_status_update(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.status(now), self.blocking_end) {
            (Status::Suspicious, _) => self.last_flagged_at,
            (Status::Benign, Some(end)) => Some(end),
            (Status::Benign, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReputationLedger {
    records: BTreeMap<String, ReputationRecord>,
}

impl ReputationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, principal: &str) -> Option<&ReputationRecord> {
        self.records.get(principal)
    }

    /// Unknown principals are Benign.
    pub fn status(&self, principal: &str, now: DateTime<Utc>) -> Status {
        self.records
            .get(principal)
            .map(|r| r.status(now))
            .unwrap_or(Status::Benign)
    }

    /// End of the current block, if the principal is blocked at `now`.
    pub fn blocked_until(&self, principal: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let record = self.records.get(principal)?;
        match record.status(now) {
            Status::Suspicious => record.blocking_end,
            Status::Benign => None,
        }
    }

    /// `(blocking_end, is_blocked)`.
    pub fn get_time(&self, principal: &str, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, bool) {
        match self.records.get(principal) {
            Some(record) => (
                record.blocking_end,
                record.status(now) == Status::Suspicious,
            ),
            None => (None, false),
        }
    }

    pub fn last_activity(&self, principal: &str) -> Option<DateTime<Utc>> {
        self.records.get(principal).and_then(|r| r.last_activity)
    }

    /// Block `principal` for `window` starting at `at` and break its streak.
    /// Returns the end of the block.
    pub fn record_misbehavior(
        &mut self,
        principal: &str,
        at: DateTime<Utc>,
        window: Duration,
    ) -> DateTime<Utc> {
        let record = self.records.entry(principal.to_string()).or_default();
        let end = at + window;
        record.blocking_end = Some(end);
        record.benign_streak_start = None;
        record.last_flagged_at = Some(at);
        end
    }

    /// Note a benign access. Returns true when the streak has just run past
    /// `threshold`; the streak then restarts at `at`, so a long benign run
    /// pays once per threshold window.
    pub fn record_benign(
        &mut self,
        principal: &str,
        at: DateTime<Utc>,
        threshold: Duration,
    ) -> bool {
        let record = self.records.entry(principal.to_string()).or_default();
        record.last_activity = Some(at);
        match record.benign_streak_start {
            None => {
                record.benign_streak_start = Some(at);
                false
            }
            Some(start) if at - start > threshold => {
                record.benign_streak_start = Some(at);
                true
            }
            Some(_) => false,
        }
    }

    pub fn remove(&mut self, principal: &str) -> Option<ReputationRecord> {
        self.records.remove(principal)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
