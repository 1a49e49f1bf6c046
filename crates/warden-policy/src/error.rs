// error.rs — Error types for the policy subsystem.

use thiserror::Error;

/// Errors that can occur during policy operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The caller is neither the creator of this policy scope nor an admin.
    #[error("'{caller}' is not the creator of this policy scope")]
    NotCreator { caller: String },

    /// A role name could not be parsed.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// A permission string could not be parsed (expected "allow" or "disallow").
    #[error("unknown permission '{0}'")]
    UnknownPermission(String),

    /// Policies must name a resource.
    #[error("policy resource must not be empty")]
    EmptyResource,
}
