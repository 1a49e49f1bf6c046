// scope.rs — Pairwise policy scopes and the registry that binds them.
//
// A pairwise scope covers access between one subject and one object over one
// resource kind. It owns its own policy table (authored by the subject, its
// creator) and can be switched off and on by its controller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_policy::{PolicyStore, Role};

use crate::error::AccessError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseScope {
    pub id: u64,
    pub subject: String,
    pub object: String,
    pub resource_kind: String,
    pub active: bool,
    pub policies: PolicyStore,
}

impl PairwiseScope {
    pub fn creator(&self) -> &str {
        self.policies.creator()
    }

    /// The creator or any admin.
    pub fn is_controller(&self, caller: &str, role: Role) -> bool {
        caller == self.creator() || role == Role::Admin
    }
}

type Binding = (String, String, String);

#[derive(Debug, Clone, Default)]
pub struct ScopeRegistry {
    scopes: Vec<PairwiseScope>,
    bindings: BTreeMap<Binding, u64>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (subject, object, resource_kind) to a new active scope. Ids are
    /// sequential from 0.
    pub fn deploy(
        &mut self,
        subject: &str,
        object: &str,
        resource_kind: &str,
    ) -> Result<u64, AccessError> {
        if let Some(scope_id) = self.scope_id(subject, object, resource_kind) {
            return Err(AccessError::ScopeAlreadyDeployed {
                subject: subject.to_string(),
                object: object.to_string(),
                resource_kind: resource_kind.to_string(),
                scope_id,
            });
        }
        let id = self.scopes.len() as u64;
        self.scopes.push(PairwiseScope {
            id,
            subject: subject.to_string(),
            object: object.to_string(),
            resource_kind: resource_kind.to_string(),
            active: true,
            policies: PolicyStore::new(subject),
        });
        self.bindings.insert(
            (
                subject.to_string(),
                object.to_string(),
                resource_kind.to_string(),
            ),
            id,
        );
        Ok(id)
    }

    pub fn scope_id(&self, subject: &str, object: &str, resource_kind: &str) -> Option<u64> {
        self.bindings
            .get(&(
                subject.to_string(),
                object.to_string(),
                resource_kind.to_string(),
            ))
            .copied()
    }

    pub fn get(&self, id: u64) -> Result<&PairwiseScope, AccessError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.scopes.get(idx))
            .ok_or(AccessError::ScopeNotFound(id))
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut PairwiseScope, AccessError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.scopes.get_mut(idx))
            .ok_or(AccessError::ScopeNotFound(id))
    }

    /// Like `get`, but an inactive scope is an error.
    pub fn active(&self, id: u64) -> Result<&PairwiseScope, AccessError> {
        let scope = self.get(id)?;
        if !scope.active {
            return Err(AccessError::ScopeInactive(id));
        }
        Ok(scope)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
