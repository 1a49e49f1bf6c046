//! # warden-core
//!
//! The decision engine of Warden access control.
//!
//! Every access attempt flows through the same pipeline:
//!
//! 1. [`AccessEvaluator`] resolves the caller's role and reputation and
//!    looks up the policy (blocked callers stop here).
//! 2. [`BehaviorClassifier`] turns the decision into [`Verdict::Benign`] or
//!    one of five [`MisbehaviorKind`]s.
//! 3. [`ReputationLedger`] and [`IncentiveEngine`] apply the verdict: a
//!    blocking window plus a token burn, or streak tracking and rewards.
//! 4. Collective resources go through the [`RequestBook`] quorum workflow.
//!
//! [`AccessControlSystem`] ties the pieces together and is the only type
//! most callers need. Operations are synchronous and totally ordered; a
//! [`Command`] batch behaves exactly like the same commands issued one by one.
//!
//! ## Key invariants
//!
//! - **Derived status**: a principal is `Suspicious` iff `now < blocking_end`.
//!   Nothing is stored about status itself, and nothing runs in the background.
//! - **Hard errors change nothing**: an `Err` leaves state, journal and sinks
//!   untouched.
//! - **Misbehavior is a successful outcome**: it is recorded, punished and
//!   reported, never returned as an error.
//! - **Quorum is fixed at creation** and approval is one-way.

pub mod classifier;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod incentive;
pub mod ledger;
pub mod quorum;
pub mod registry;
pub mod reputation;
pub mod scope;
pub mod system;
pub mod table;

pub use classifier::{BehaviorClassifier, ClassifierInput, MisbehaviorKind, Verdict};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{Command, CommandOutput};
pub use config::{ConfigError, QuorumRule, WardenConfig};
pub use error::AccessError;
pub use evaluator::{AccessEvaluator, Decision, Evaluated, Evaluation, Gate};
pub use incentive::IncentiveEngine;
pub use ledger::{InMemoryTokenLedger, LedgerError, TokenLedger};
pub use quorum::{AccessRequest, RequestBook, RequestState, VoteResult};
pub use registry::{IdentityRegistry, MemberRegistry};
pub use reputation::{ReputationLedger, ReputationRecord, Status};
pub use scope::{PairwiseScope, ScopeRegistry};
pub use system::{AccessControlSystem, MemberStatus, MisbehaviorReport, Outcome};
pub use table::{ResourceTable, TableScope};

/// Resource name of the organization-wide roster.
pub const GLOBAL_RESOURCE_TABLE: &str = "GlobalResourceTable";

/// Resource name of the per-group roster.
pub const LOCAL_RESOURCE_TABLE: &str = "LocalResourceTable";
