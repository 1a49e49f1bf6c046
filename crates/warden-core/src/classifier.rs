// classifier.rs — The behavior decision table.
//
// Rules are checked in order and the first match wins:
//
//   1. DenialOfService      lifecycle action by someone who does not control the scope
//   2. PrivilegeEscalation  roster mutation on an equal-or-higher rank, or without an Allow rule
//   3. TamperingWithData    denied mutating action on a resource the policy table knows
//   4. TooFrequentAccess    allowed, but inside the cooldown since the last benign access
//   5. UnauthorizedAccess   any other denial
//   6. Benign
//
// The classifier is pure: it reads an evaluation plus context and returns a
// verdict. Applying the verdict (blocking, burning, rewarding) is the
// system's job.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use warden_policy::{PolicyLookup, Role};

use crate::evaluator::{Decision, Evaluation};

/// The five misbehavior categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisbehaviorKind {
    TooFrequentAccess,
    UnauthorizedAccess,
    TamperingWithData,
    DenialOfService,
    PrivilegeEscalation,
}

impl MisbehaviorKind {
    pub const ALL: [MisbehaviorKind; 5] = [
        MisbehaviorKind::TooFrequentAccess,
        MisbehaviorKind::UnauthorizedAccess,
        MisbehaviorKind::TamperingWithData,
        MisbehaviorKind::DenialOfService,
        MisbehaviorKind::PrivilegeEscalation,
    ];

    /// Reason string carried by `MaliciousActivityReported`.
    pub fn reason(self) -> &'static str {
        match self {
            MisbehaviorKind::TooFrequentAccess => "Too frequent access",
            MisbehaviorKind::UnauthorizedAccess => "Unauthorized access attempt",
            MisbehaviorKind::TamperingWithData => "Tampering with data",
            MisbehaviorKind::DenialOfService => "Denial of Service",
            MisbehaviorKind::PrivilegeEscalation => "Privilege escalation",
        }
    }

    /// Ordinal severity. Blocking windows must not decrease with it.
    pub fn severity(self) -> u8 {
        match self {
            MisbehaviorKind::TooFrequentAccess | MisbehaviorKind::UnauthorizedAccess => 1,
            MisbehaviorKind::TamperingWithData => 2,
            MisbehaviorKind::DenialOfService | MisbehaviorKind::PrivilegeEscalation => 3,
        }
    }
}

impl fmt::Display for MisbehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Benign,
    Misbehavior(MisbehaviorKind),
}

impl Verdict {
    pub fn is_benign(self) -> bool {
        self == Verdict::Benign
    }
}

/// What the classifier looks at besides the evaluation itself.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub evaluation: &'a Evaluation,
    /// The caller created the scope being acted on, or is an admin.
    pub is_controller: bool,
    /// Role of the roster entry a table mutation touches. `None` when the
    /// attempt is not a roster mutation.
    pub roster_target: Option<Role>,
    /// Some rule in the scope's policy table names this resource.
    pub resource_known: bool,
    /// Last benign activity of the caller.
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BehaviorClassifier {
    cooldown: Duration,
}

impl BehaviorClassifier {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn classify(&self, input: &ClassifierInput<'_>) -> Verdict {
        let eval = input.evaluation;

        if eval.action.is_lifecycle() && !input.is_controller {
            return Verdict::Misbehavior(MisbehaviorKind::DenialOfService);
        }

        if let Some(target) = input.roster_target {
            let outranked = eval.role != Role::Admin && target.outranks_or_equals(eval.role);
            if outranked || eval.lookup != PolicyLookup::Allow {
                return Verdict::Misbehavior(MisbehaviorKind::PrivilegeEscalation);
            }
        }

        match eval.decision {
            Decision::Denied if eval.action.is_mutating() && input.resource_known => {
                Verdict::Misbehavior(MisbehaviorKind::TamperingWithData)
            }
            Decision::Denied => Verdict::Misbehavior(MisbehaviorKind::UnauthorizedAccess),
            Decision::Allowed => {
                let too_soon = input
                    .last_activity
                    .is_some_and(|last| eval.at - last < self.cooldown);
                if too_soon {
                    Verdict::Misbehavior(MisbehaviorKind::TooFrequentAccess)
                } else {
                    Verdict::Benign
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::Action;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn evaluation(role: Role, action: Action, lookup: PolicyLookup, decision: Decision) -> Evaluation {
        Evaluation {
            principal: "alice".to_string(),
            role,
            resource: "test.jpg".to_string(),
            action,
            lookup,
            decision,
            at: t0(),
        }
    }

    fn input(eval: &Evaluation) -> ClassifierInput<'_> {
        ClassifierInput {
            evaluation: eval,
            is_controller: false,
            roster_target: None,
            resource_known: true,
            last_activity: None,
        }
    }

    fn classifier() -> BehaviorClassifier {
        BehaviorClassifier::new(Duration::seconds(60))
    }

    #[test]
    fn reason_strings() {
        assert_eq!(MisbehaviorKind::TooFrequentAccess.reason(), "Too frequent access");
        assert_eq!(
            MisbehaviorKind::UnauthorizedAccess.reason(),
            "Unauthorized access attempt"
        );
        assert_eq!(MisbehaviorKind::TamperingWithData.reason(), "Tampering with data");
        assert_eq!(MisbehaviorKind::DenialOfService.reason(), "Denial of Service");
        assert_eq!(MisbehaviorKind::PrivilegeEscalation.reason(), "Privilege escalation");
    }

    #[test]
    fn allowed_first_access_is_benign() {
        let eval = evaluation(Role::SecondaryHead, Action::View, PolicyLookup::Allow, Decision::Allowed);
        assert_eq!(classifier().classify(&input(&eval)), Verdict::Benign);
    }

    #[test]
    fn allowed_within_cooldown_is_too_frequent() {
        let eval = evaluation(Role::SecondaryHead, Action::View, PolicyLookup::Allow, Decision::Allowed);
        let mut ctx = input(&eval);
        ctx.last_activity = Some(t0() - Duration::seconds(59));
        assert_eq!(
            classifier().classify(&ctx),
            Verdict::Misbehavior(MisbehaviorKind::TooFrequentAccess)
        );

        ctx.last_activity = Some(t0() - Duration::seconds(60));
        assert_eq!(classifier().classify(&ctx), Verdict::Benign);
    }

    #[test]
    fn denied_mutation_on_known_resource_is_tampering() {
        let eval = evaluation(Role::SecondaryHead, Action::Delete, PolicyLookup::Disallow, Decision::Denied);
        assert_eq!(
            classifier().classify(&input(&eval)),
            Verdict::Misbehavior(MisbehaviorKind::TamperingWithData)
        );
    }

    #[test]
    fn denied_mutation_on_unknown_resource_is_unauthorized() {
        let eval = evaluation(Role::SecondaryHead, Action::Edit, PolicyLookup::NotFound, Decision::Denied);
        let mut ctx = input(&eval);
        ctx.resource_known = false;
        assert_eq!(
            classifier().classify(&ctx),
            Verdict::Misbehavior(MisbehaviorKind::UnauthorizedAccess)
        );
    }

    #[test]
    fn denied_read_is_unauthorized() {
        let eval = evaluation(Role::RegularMember, Action::View, PolicyLookup::NotFound, Decision::Denied);
        assert_eq!(
            classifier().classify(&input(&eval)),
            Verdict::Misbehavior(MisbehaviorKind::UnauthorizedAccess)
        );
    }

    #[test]
    fn lifecycle_by_non_controller_is_dos_before_anything_else() {
        let eval = evaluation(Role::PrimaryHead, Action::Deactivate, PolicyLookup::Allow, Decision::Allowed);
        assert_eq!(
            classifier().classify(&input(&eval)),
            Verdict::Misbehavior(MisbehaviorKind::DenialOfService)
        );

        let mut ctx = input(&eval);
        ctx.is_controller = true;
        assert_eq!(classifier().classify(&ctx), Verdict::Benign);
    }

    #[test]
    fn roster_mutation_without_allow_is_privilege_escalation() {
        let eval = evaluation(Role::PrimaryHead, Action::Edit, PolicyLookup::NotFound, Decision::Denied);
        let mut ctx = input(&eval);
        ctx.roster_target = Some(Role::RegularMember);
        assert_eq!(
            classifier().classify(&ctx),
            Verdict::Misbehavior(MisbehaviorKind::PrivilegeEscalation)
        );
    }

    #[test]
    fn roster_mutation_on_equal_rank_is_privilege_escalation() {
        let eval = evaluation(Role::SecondaryHead, Action::Delete, PolicyLookup::Allow, Decision::Allowed);
        let mut ctx = input(&eval);
        ctx.roster_target = Some(Role::SecondaryHead);
        assert_eq!(
            classifier().classify(&ctx),
            Verdict::Misbehavior(MisbehaviorKind::PrivilegeEscalation)
        );

        ctx.roster_target = Some(Role::RegularMember);
        assert_eq!(classifier().classify(&ctx), Verdict::Benign);
    }

    #[test]
    fn admin_is_exempt_from_rank_check() {
        let eval = evaluation(Role::Admin, Action::Delete, PolicyLookup::Allow, Decision::Allowed);
        let mut ctx = input(&eval);
        ctx.roster_target = Some(Role::Admin);
        assert_eq!(classifier().classify(&ctx), Verdict::Benign);
    }

    #[test]
    fn allowed_roster_mutation_without_approval_is_tampering() {
        // Allow rule present, but no approved request: the gate denies.
        let eval = evaluation(Role::PrimaryHead, Action::Edit, PolicyLookup::Allow, Decision::Denied);
        let mut ctx = input(&eval);
        ctx.roster_target = Some(Role::RegularMember);
        assert_eq!(
            classifier().classify(&ctx),
            Verdict::Misbehavior(MisbehaviorKind::TamperingWithData)
        );
    }

    #[test]
    fn severity_is_ordered() {
        assert!(MisbehaviorKind::DenialOfService.severity() > MisbehaviorKind::TamperingWithData.severity());
        assert!(MisbehaviorKind::TamperingWithData.severity() > MisbehaviorKind::TooFrequentAccess.severity());
        assert_eq!(MisbehaviorKind::ALL.len(), 5);
    }
}
