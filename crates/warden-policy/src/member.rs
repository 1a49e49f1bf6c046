// member.rs — A registered principal as the rest of the system sees it.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Identity record for a principal: who they are, which group they belong
/// to, and the role they hold. Roster snapshots are lists of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub group: String,
    pub role: Role,
}

impl Member {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        group: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: group.into(),
            role,
        }
    }

    pub fn same_group(&self, other: &Member) -> bool {
        self.group == other.group
    }
}
