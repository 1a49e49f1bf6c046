// role.rs — The role hierarchy and the two-valued permission.
//
// Roles form a strict ladder used by the classifier for privilege checks:
//   Admin > PrimaryHead > SecondaryHead > RegularMember > None
// `None` is what the identity registry reports for unknown principals; it is
// never a valid requester.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// A principal's role in the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    None,
    Admin,
    PrimaryHead,
    SecondaryHead,
    RegularMember,
}

impl Role {
    /// Position in the hierarchy. Higher outranks lower.
    pub fn rank(self) -> u8 {
        match self {
            Role::None => 0,
            Role::RegularMember => 1,
            Role::SecondaryHead => 2,
            Role::PrimaryHead => 3,
            Role::Admin => 4,
        }
    }

    /// Whether this role may be used as a requester at all.
    pub fn is_registered(self) -> bool {
        self != Role::None
    }

    /// True when `self` is at or above `other` in the hierarchy.
    pub fn outranks_or_equals(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Admin => "admin",
            Role::PrimaryHead => "primary_head",
            Role::SecondaryHead => "secondary_head",
            Role::RegularMember => "regular_member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Role::None),
            "admin" => Ok(Role::Admin),
            "primary_head" | "primary_group_head" => Ok(Role::PrimaryHead),
            "secondary_head" | "secondary_group_head" => Ok(Role::SecondaryHead),
            "regular_member" | "member" => Ok(Role::RegularMember),
            other => Err(PolicyError::UnknownRole(other.to_string())),
        }
    }
}

/// The stored outcome of a policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Allow,
    Disallow,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Allow => f.write_str("allow"),
            Permission::Disallow => f.write_str("disallow"),
        }
    }
}

impl FromStr for Permission {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Permission::Allow),
            "disallow" | "deny" => Ok(Permission::Disallow),
            other => Err(PolicyError::UnknownPermission(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_hierarchy() {
        assert!(Role::Admin.rank() > Role::PrimaryHead.rank());
        assert!(Role::PrimaryHead.rank() > Role::SecondaryHead.rank());
        assert!(Role::SecondaryHead.rank() > Role::RegularMember.rank());
        assert!(Role::RegularMember.rank() > Role::None.rank());
    }

    #[test]
    fn equal_roles_count_as_outranking() {
        assert!(Role::PrimaryHead.outranks_or_equals(Role::PrimaryHead));
        assert!(!Role::SecondaryHead.outranks_or_equals(Role::PrimaryHead));
    }

    #[test]
    fn parse_role_accepts_group_head_aliases() {
        assert_eq!("primary_group_head".parse::<Role>().unwrap(), Role::PrimaryHead);
        assert_eq!("SECONDARY_HEAD".parse::<Role>().unwrap(), Role::SecondaryHead);
        assert_eq!(
            "overlord".parse::<Role>(),
            Err(PolicyError::UnknownRole("overlord".to_string()))
        );
    }

    #[test]
    fn parse_permission() {
        assert_eq!("allow".parse::<Permission>().unwrap(), Permission::Allow);
        assert_eq!("disallow".parse::<Permission>().unwrap(), Permission::Disallow);
        assert!("maybe".parse::<Permission>().is_err());
    }

    #[test]
    fn role_serializes_as_snake_case() {
        let json = serde_json::to_string(&Role::PrimaryHead).unwrap();
        assert_eq!(json, "\"primary_head\"");
    }
}
