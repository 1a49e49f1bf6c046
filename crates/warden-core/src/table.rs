// table.rs — The organization roster behind the Global/Local resource tables.
//
// One ordered roster of members. The Global table is the whole roster; a
// Local table is the slice belonging to one group, in the same order.

use serde::{Deserialize, Serialize};
use warden_policy::{Member, PolicyStore};

use crate::error::AccessError;
use crate::quorum::RequestBook;

/// Everything behind the two resource tables: the roster, its policy table
/// (authored by the system admin) and the collective request book.
#[derive(Debug, Clone)]
pub struct TableScope {
    pub policies: PolicyStore,
    pub requests: RequestBook,
    pub roster: ResourceTable,
}

impl TableScope {
    pub fn new(admin: &str, roster: Vec<Member>) -> Self {
        Self {
            policies: PolicyStore::new(admin),
            requests: RequestBook::new(),
            roster: ResourceTable::new(roster),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTable {
    entries: Vec<Member>,
}

impl ResourceTable {
    pub fn new(entries: Vec<Member>) -> Self {
        Self { entries }
    }

    pub fn snapshot(&self) -> Vec<Member> {
        self.entries.clone()
    }

    pub fn local_snapshot(&self, group: &str) -> Vec<Member> {
        self.entries
            .iter()
            .filter(|m| m.group == group)
            .cloned()
            .collect()
    }

    pub fn entry(&self, principal: &str) -> Result<&Member, AccessError> {
        self.entries
            .iter()
            .find(|m| m.id == principal)
            .ok_or_else(|| AccessError::RosterEntryNotFound {
                principal: principal.to_string(),
            })
    }

    fn position(&self, principal: &str) -> Result<usize, AccessError> {
        self.entries
            .iter()
            .position(|m| m.id == principal)
            .ok_or_else(|| AccessError::RosterEntryNotFound {
                principal: principal.to_string(),
            })
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.entries.iter().any(|m| m.id == principal)
    }

    /// Overwrite `old`'s entry in place with `new`. `new` may not already
    /// hold another entry.
    pub fn replace(&mut self, old: &str, new: Member) -> Result<Member, AccessError> {
        let idx = self.position(old)?;
        if new.id != old && self.contains(&new.id) {
            return Err(AccessError::RosterEntryExists { principal: new.id });
        }
        Ok(std::mem::replace(&mut self.entries[idx], new))
    }

    pub fn remove(&mut self, target: &str) -> Result<Member, AccessError> {
        let idx = self.position(target)?;
        Ok(self.entries.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::Role;

    fn table() -> ResourceTable {
        ResourceTable::new(vec![
            Member::new("ph1", "Primary 1", "type1", Role::PrimaryHead),
            Member::new("rm1", "Member 1", "type1", Role::RegularMember),
            Member::new("rm2", "Member 2", "type2", Role::RegularMember),
        ])
    }

    #[test]
    fn local_snapshot_filters_by_group() {
        let ids: Vec<String> = table()
            .local_snapshot("type1")
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["ph1", "rm1"]);
        assert!(table().local_snapshot("type9").is_empty());
    }

    #[test]
    fn replace_keeps_position() {
        let mut table = table();
        let new = Member::new("rm3", "Member 3", "type2", Role::RegularMember);
        let old = table.replace("rm1", new.clone()).unwrap();
        assert_eq!(old.id, "rm1");
        assert_eq!(table.snapshot()[1], new);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn replace_rejects_a_second_entry_for_the_same_member() {
        let mut table = table();
        let rm2 = table.entry("rm2").unwrap().clone();
        assert!(matches!(
            table.replace("rm1", rm2),
            Err(AccessError::RosterEntryExists { principal }) if principal == "rm2"
        ));
        assert!(table.contains("rm1"));
        assert_eq!(table.len(), 3);

        // Refreshing an entry with its own record is fine.
        let rm1 = table.entry("rm1").unwrap().clone();
        assert!(table.replace("rm1", rm1).is_ok());
    }

    #[test]
    fn remove_and_missing_entries() {
        let mut table = table();
        table.remove("rm2").unwrap();
        assert_eq!(table.len(), 2);
        assert!(matches!(
            table.remove("rm2"),
            Err(AccessError::RosterEntryNotFound { .. })
        ));
        assert!(table.entry("ph1").is_ok());
    }
}
