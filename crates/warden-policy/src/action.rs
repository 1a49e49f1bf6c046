// action.rs — Actions a principal can attempt on a resource.
//
// The well-known verbs get their own variants so the classifier can match on
// them exhaustively. Anything else is carried through as `Other` so that
// unknown actions still reach policy lookup (and come back `NotFound`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// An action verb. Serialized as its lowercase string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    View,
    Edit,
    Delete,
    Activate,
    Deactivate,
    Other(String),
}

/// Coarse grouping used by the behavior classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Reads state (`view`).
    Read,
    /// Changes table or resource contents (`edit`, `delete`).
    Mutating,
    /// Switches a scope on or off (`activate`, `deactivate`).
    Lifecycle,
    /// Not a verb this system knows.
    Unknown,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::View => ActionKind::Read,
            Action::Edit | Action::Delete => ActionKind::Mutating,
            Action::Activate | Action::Deactivate => ActionKind::Lifecycle,
            Action::Other(_) => ActionKind::Unknown,
        }
    }

    /// Lifecycle actions change state too, so they count as mutating.
    pub fn is_mutating(&self) -> bool {
        matches!(self.kind(), ActionKind::Mutating | ActionKind::Lifecycle)
    }

    pub fn is_lifecycle(&self) -> bool {
        self.kind() == ActionKind::Lifecycle
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Activate => "activate",
            Action::Deactivate => "deactivate",
            Action::Other(verb) => verb,
        }
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "view" => Action::View,
            "edit" => Action::Edit,
            "delete" => Action::Delete,
            "activate" => Action::Activate,
            "deactivate" => Action::Deactivate,
            other => Action::Other(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Action::from(s.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_verbs_parse_to_variants() {
        assert_eq!(Action::from("view"), Action::View);
        assert_eq!(Action::from("deactivate"), Action::Deactivate);
        assert_eq!(
            Action::from("nonexistentAction"),
            Action::Other("nonexistentAction".to_string())
        );
    }

    #[test]
    fn lifecycle_actions_are_mutating() {
        assert!(Action::Deactivate.is_mutating());
        assert!(Action::Deactivate.is_lifecycle());
        assert!(Action::Delete.is_mutating());
        assert!(!Action::Delete.is_lifecycle());
        assert!(!Action::View.is_mutating());
        assert!(!Action::Other("share".into()).is_mutating());
    }

    #[test]
    fn action_serializes_as_plain_string() {
        let json = serde_json::to_string(&Action::Edit).unwrap();
        assert_eq!(json, "\"edit\"");
        let restored: Action = serde_json::from_str("\"publish\"").unwrap();
        assert_eq!(restored, Action::Other("publish".to_string()));
    }
}
