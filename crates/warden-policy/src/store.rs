// store.rs — The per-scope policy table.
//
// A PolicyStore holds at most one permission per (role, resource, action).
// Writes are restricted to the store's creator or an admin; there is no delete.
// A missing rule is reported as `NotFound`, which callers treat like
// `Disallow` but may surface separately.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::PolicyError;
use crate::role::{Permission, Role};

/// Composite key for a policy rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolicyKey {
    pub role: Role,
    pub resource: String,
    pub action: Action,
}

impl PolicyKey {
    pub fn new(role: Role, resource: impl Into<String>, action: Action) -> Self {
        Self {
            role,
            resource: resource.into(),
            action,
        }
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.role, self.resource, self.action)
    }
}

/// Three-valued result of a policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLookup {
    Allow,
    Disallow,
    NotFound,
}

impl PolicyLookup {
    pub fn is_allow(self) -> bool {
        self == PolicyLookup::Allow
    }
}

impl From<Permission> for PolicyLookup {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Allow => PolicyLookup::Allow,
            Permission::Disallow => PolicyLookup::Disallow,
        }
    }
}

/// A flattened rule, for listing and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub role: Role,
    pub resource: String,
    pub action: Action,
    pub permission: Permission,
}

/// The policy table for one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyStore {
    creator: String,
    #[serde(with = "rules_as_list")]
    rules: BTreeMap<PolicyKey, Permission>,
}

impl PolicyStore {
    /// Create an empty store. Everything is denied until rules are added.
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            rules: BTreeMap::new(),
        }
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// Whether `caller` may write rules to this store.
    pub fn can_author(&self, caller: &str, caller_role: Role) -> bool {
        caller == self.creator || caller_role == Role::Admin
    }

    /// Add or overwrite a rule. Returns the permission it replaced, if any.
    pub fn policy_add(
        &mut self,
        caller: &str,
        caller_role: Role,
        role: Role,
        resource: &str,
        action: Action,
        permission: Permission,
    ) -> Result<Option<Permission>, PolicyError> {
        if !self.can_author(caller, caller_role) {
            return Err(PolicyError::NotCreator {
                caller: caller.to_string(),
            });
        }
        if resource.trim().is_empty() {
            return Err(PolicyError::EmptyResource);
        }

        let key = PolicyKey::new(role, resource, action);
        tracing::debug!(%key, %permission, "policy rule written");
        Ok(self.rules.insert(key, permission))
    }

    pub fn lookup(&self, role: Role, resource: &str, action: &Action) -> PolicyLookup {
        let key = PolicyKey::new(role, resource, action.clone());
        self.rules
            .get(&key)
            .map(|p| PolicyLookup::from(*p))
            .unwrap_or(PolicyLookup::NotFound)
    }

    /// True if any rule, for any role or action, names `resource`.
    pub fn knows_resource(&self, resource: &str) -> bool {
        self.rules.keys().any(|k| k.resource == resource)
    }

    pub fn rules(&self) -> Vec<PolicyRule> {
        self.rules
            .iter()
            .map(|(k, p)| PolicyRule {
                role: k.role,
                resource: k.resource.clone(),
                action: k.action.clone(),
                permission: *p,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// JSON object keys must be strings, so the map round-trips as a rule list.
mod rules_as_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{PolicyKey, PolicyRule};
    use crate::role::Permission;

    pub fn serialize<S: Serializer>(
        rules: &BTreeMap<PolicyKey, Permission>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<PolicyRule> = rules
            .iter()
            .map(|(k, p)| PolicyRule {
                role: k.role,
                resource: k.resource.clone(),
                action: k.action.clone(),
                permission: *p,
            })
            .collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PolicyKey, Permission>, D::Error> {
        let list = Vec::<PolicyRule>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|r| (PolicyKey::new(r.role, r.resource, r.action), r.permission))
            .collect())
    }
}
