// registry.rs — The identity/role registry Warden consumes.
//
// Role assignment is not Warden's business: the registry is authoritative
// and Warden only reads it (plus `revoke`, for admin-driven removal).
// `MemberRegistry` is the in-memory implementation used by the CLI and tests.

use std::sync::{Mutex, MutexGuard};

use warden_policy::{Member, Role};

use crate::error::AccessError;

pub trait IdentityRegistry: Send + Sync {
    fn member(&self, id: &str) -> Option<Member>;

    /// Every member in registration order.
    fn members(&self) -> Vec<Member>;

    /// Remove a member. Returns the removed record.
    fn revoke(&self, id: &str) -> Option<Member>;

    /// `Role::None` for unknown principals.
    fn role(&self, id: &str) -> Role {
        self.member(id).map(|m| m.role).unwrap_or(Role::None)
    }

    fn group(&self, id: &str) -> Option<String> {
        self.member(id).map(|m| m.group)
    }

    fn count_with_role(&self, role: Role) -> usize {
        self.members().iter().filter(|m| m.role == role).count()
    }
}

#[derive(Debug, Default)]
pub struct MemberRegistry {
    members: Mutex<Vec<Member>>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a principal. Ids are unique and `Role::None` is not a role
    /// anyone can be given.
    pub fn register(
        &self,
        id: &str,
        name: &str,
        group: &str,
        role: Role,
    ) -> Result<(), AccessError> {
        if !role.is_registered() {
            return Err(AccessError::unregistered(id));
        }
        let mut members = self.lock();
        if members.iter().any(|m| m.id == id) {
            return Err(AccessError::DuplicateMember(id.to_string()));
        }
        tracing::debug!(member = id, %role, group, "member registered");
        members.push(Member::new(id, name, group, role));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Member>> {
        self.members.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IdentityRegistry for MemberRegistry {
    fn member(&self, id: &str) -> Option<Member> {
        self.lock().iter().find(|m| m.id == id).cloned()
    }

    fn members(&self) -> Vec<Member> {
        self.lock().clone()
    }

    fn revoke(&self, id: &str) -> Option<Member> {
        let mut members = self.lock();
        let idx = members.iter().position(|m| m.id == id)?;
        Some(members.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MemberRegistry {
        let registry = MemberRegistry::new();
        registry.register("root", "Root", "ops", Role::Admin).unwrap();
        registry.register("ph1", "Primary 1", "type1", Role::PrimaryHead).unwrap();
        registry.register("ph2", "Primary 2", "type2", Role::PrimaryHead).unwrap();
        registry.register("rm1", "Member 1", "type1", Role::RegularMember).unwrap();
        registry
    }

    #[test]
    fn unknown_principal_has_no_role() {
        let registry = registry();
        assert_eq!(registry.role("ghost"), Role::None);
        assert_eq!(registry.group("ghost"), None);
        assert_eq!(registry.role("ph1"), Role::PrimaryHead);
        assert_eq!(registry.group("rm1").as_deref(), Some("type1"));
    }

    #[test]
    fn members_keep_registration_order() {
        let ids: Vec<String> = registry().members().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["root", "ph1", "ph2", "rm1"]);
    }

    #[test]
    fn count_with_role() {
        let registry = registry();
        assert_eq!(registry.count_with_role(Role::PrimaryHead), 2);
        assert_eq!(registry.count_with_role(Role::SecondaryHead), 0);
    }

    #[test]
    fn duplicate_and_roleless_registration_rejected() {
        let registry = registry();
        assert!(registry.register("ph1", "Again", "type1", Role::RegularMember).is_err());
        assert!(registry.register("nobody", "Nobody", "type1", Role::None).is_err());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn revoke_removes_member() {
        let registry = registry();
        let removed = registry.revoke("ph2").unwrap();
        assert_eq!(removed.role, Role::PrimaryHead);
        assert_eq!(registry.role("ph2"), Role::None);
        assert_eq!(registry.count_with_role(Role::PrimaryHead), 1);
        assert!(registry.revoke("ph2").is_none());
    }
}
