// event.rs — Observable events emitted by Warden operations.
//
// Events are plain data: they never carry wall-clock ids or random values,
// so the journal built from them is reproducible. Sinks receive them wrapped
// in an `EventEnvelope`, which adds a unique id and the emission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_policy::{Action, Member, Permission, Role};

/// Everything an operation can report to the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AccessEvent {
    /// A policy rule was written (or overwritten).
    PolicyAdded {
        /// `None` for the resource-table scope.
        scope_id: Option<u64>,
        author: String,
        role: Role,
        resource: String,
        action: Action,
        permission: Permission,
    },

    /// A pairwise scope was bound by the registry.
    ScopeDeployed {
        scope_id: u64,
        subject: String,
        object: String,
        resource_kind: String,
    },

    ScopeActivated {
        scope_id: u64,
        by: String,
    },

    ScopeDeactivated {
        scope_id: u64,
        by: String,
    },

    /// A pairwise access attempt was evaluated and classified.
    AccessControlChecked {
        scope_id: u64,
        principal: String,
        resource: String,
        action: Action,
        allowed: bool,
    },

    /// The policy lookup for an access attempt found no rule at all.
    PolicyNotFoundForAccessControl { resource: String, action: Action },

    /// A collective access request was opened.
    AccessRequestCreated {
        id: u64,
        requester: String,
        resource: String,
        action: Action,
        required_quorum: usize,
    },

    /// A PrimaryHead approved a pending request.
    AccessVoteRecorded {
        id: u64,
        voter: String,
        approvals: usize,
        required_quorum: usize,
    },

    /// A request reached quorum.
    AccessGranted { id: u64, requester: String },

    /// An admin withdrew the grant of an approved request.
    AccessRequestRevoked { id: u64, revoked_by: String },

    /// A classified misbehavior. `reason` is the human-readable kind.
    MaliciousActivityReported {
        principal: String,
        reason: String,
        #[serde(with = "crate::amount")]
        penalty_amount: u128,
        blocking_end: DateTime<Utc>,
    },

    /// A principal completed a benign streak and was paid.
    BenignBehaviorRewarded {
        principal: String,
        #[serde(with = "crate::amount")]
        amount: u128,
    },

    GlobalResourceTableViewed {
        viewer: String,
        snapshot: Vec<Member>,
    },

    LocalResourceTableViewed {
        viewer: String,
        group: String,
        snapshot: Vec<Member>,
    },

    /// `old`'s roster entry was replaced by `new`'s registry record.
    GlobalResourceTableEdited {
        editor: String,
        old: String,
        new: String,
    },

    GlobalResourceTableEntryDeleted { deleter: String, target: String },

    /// An admin removed a member's identity and reputation.
    MemberRevoked { member: String, by: String },
}

impl AccessEvent {
    /// The serialized `event_type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            AccessEvent::PolicyAdded { .. } => "policy_added",
            AccessEvent::ScopeDeployed { .. } => "scope_deployed",
            AccessEvent::ScopeActivated { .. } => "scope_activated",
            AccessEvent::ScopeDeactivated { .. } => "scope_deactivated",
            AccessEvent::AccessControlChecked { .. } => "access_control_checked",
            AccessEvent::PolicyNotFoundForAccessControl { .. } => {
                "policy_not_found_for_access_control"
            }
            AccessEvent::AccessRequestCreated { .. } => "access_request_created",
            AccessEvent::AccessVoteRecorded { .. } => "access_vote_recorded",
            AccessEvent::AccessGranted { .. } => "access_granted",
            AccessEvent::AccessRequestRevoked { .. } => "access_request_revoked",
            AccessEvent::MaliciousActivityReported { .. } => "malicious_activity_reported",
            AccessEvent::BenignBehaviorRewarded { .. } => "benign_behavior_rewarded",
            AccessEvent::GlobalResourceTableViewed { .. } => "global_resource_table_viewed",
            AccessEvent::LocalResourceTableViewed { .. } => "local_resource_table_viewed",
            AccessEvent::GlobalResourceTableEdited { .. } => "global_resource_table_edited",
            AccessEvent::GlobalResourceTableEntryDeleted { .. } => {
                "global_resource_table_entry_deleted"
            }
            AccessEvent::MemberRevoked { .. } => "member_revoked",
        }
    }

    pub fn is_misbehavior(&self) -> bool {
        matches!(self, AccessEvent::MaliciousActivityReported { .. })
    }

    /// Reason string of a misbehavior report, if this is one.
    pub fn misbehavior_reason(&self) -> Option<&str> {
        match self {
            AccessEvent::MaliciousActivityReported { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// An event as delivered to sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AccessEvent,
}

impl EventEnvelope {
    pub fn new(event: AccessEvent, emitted_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            emitted_at,
            event,
        }
    }
}
