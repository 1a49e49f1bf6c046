//! # warden-policy
//!
//! Policy tables for Warden access control.
//!
//! A [`PolicyStore`] maps `(role, resource, action)` triples to a
//! [`Permission`]. Lookups are three-valued: [`PolicyLookup::Allow`],
//! [`PolicyLookup::Disallow`], or [`PolicyLookup::NotFound`]. Downstream
//! evaluation treats `NotFound` exactly like `Disallow`, but the distinction
//! is kept so observers can tell a missing rule from an explicit denial.
//!
//! ## Key invariants
//!
//! - **Default deny**: no entry → `NotFound` → denied.
//! - **One live rule per key**: [`PolicyStore::policy_add`] overwrites.
//! - **Creator-authored**: only the store's creator or an admin may write.

pub mod action;
pub mod error;
pub mod member;
pub mod role;
pub mod store;

pub use action::{Action, ActionKind};
pub use error::PolicyError;
pub use member::Member;
pub use role::{Permission, Role};
pub use store::{PolicyKey, PolicyLookup, PolicyRule, PolicyStore};
