// error.rs — Hard precondition failures.
//
// An `AccessError` aborts the whole operation: no state change, no event,
// no journal entry. Classified misbehavior is never an error; it comes back
// as `Outcome::Misbehavior`.

use thiserror::Error;
use warden_audit::AuditError;
use warden_policy::{PolicyError, Role};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AccessError {
    /// The identity registry has no role for this principal.
    #[error("principal '{principal}' is not registered")]
    UnregisteredPrincipal { principal: String },

    /// The caller may not perform this administrative operation.
    #[error("'{caller}' is not authorized to {operation}")]
    NotAuthorized { caller: String, operation: String },

    /// The caller's role is not the one this operation requires.
    #[error("Access denied: incorrect role ('{caller}' is {actual}, requires {required})")]
    IncorrectRole {
        caller: String,
        required: Role,
        actual: Role,
    },

    /// Pairwise scopes bind principals of one group unless the resource kind
    /// is a shared namespace.
    #[error(
        "Subject and Object must be in the same group or in global resource table \
         ('{subject}' in {subject_group}, '{object}' in {object_group})"
    )]
    GroupMismatch {
        subject: String,
        subject_group: String,
        object: String,
        object_group: String,
    },

    #[error("a scope for ({subject}, {object}, {resource_kind}) already exists with id {scope_id}")]
    ScopeAlreadyDeployed {
        subject: String,
        object: String,
        resource_kind: String,
        scope_id: u64,
    },

    #[error("scope {0} not found")]
    ScopeNotFound(u64),

    #[error("scope {0} is deactivated")]
    ScopeInactive(u64),

    #[error("access request {0} not found")]
    RequestNotFound(u64),

    /// The same PrimaryHead already approved this request.
    #[error("'{voter}' has already approved request {id}")]
    DuplicateVote { id: u64, voter: String },

    #[error("principal '{0}' is already registered")]
    DuplicateMember(String),

    #[error("no roster entry for '{principal}'")]
    RosterEntryNotFound { principal: String },

    /// Each principal appears on the roster at most once.
    #[error("'{principal}' already has a roster entry")]
    RosterEntryExists { principal: String },

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("journal error: {0}")]
    Journal(#[from] AuditError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AccessError {
    pub(crate) fn unregistered(principal: &str) -> Self {
        AccessError::UnregisteredPrincipal {
            principal: principal.to_string(),
        }
    }

    pub(crate) fn not_authorized(caller: &str, operation: &str) -> Self {
        AccessError::NotAuthorized {
            caller: caller.to_string(),
            operation: operation.to_string(),
        }
    }
}
