// system.rs — AccessControlSystem: the facade every operation goes through.
//
// Each public operation runs inside `run`, which reads the clock once,
// collects the events the operation emits, and on success records one
// journal entry and dispatches the events to sinks. An `Err` discards
// everything; operations do all of their fallible checks before they
// touch state.
//
// Access attempts go through `screen`:
//
//   evaluate ─▶ blocked?            → Outcome::Blocked (no event)
//            ─▶ classify ─▶ misbehavior → block + burn + MaliciousActivityReported
//                        ─▶ benign      → streak/reward, operation proceeds
//
// Operations that resolve roster entries or scopes before screening call
// `blocked` first, so a blocked caller gets Outcome::Blocked whatever
// arguments it passed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_audit::{AccessEvent, EventDispatcher, Journal, NotificationSink};
use warden_policy::{Action, Member, Permission, PolicyLookup, PolicyStore, Role};

use crate::classifier::{BehaviorClassifier, ClassifierInput, MisbehaviorKind, Verdict};
use crate::clock::Clock;
use crate::config::WardenConfig;
use crate::error::AccessError;
use crate::evaluator::{AccessEvaluator, Evaluated, Evaluation, Gate};
use crate::incentive::IncentiveEngine;
use crate::ledger::TokenLedger;
use crate::quorum::AccessRequest;
use crate::registry::IdentityRegistry;
use crate::reputation::{ReputationLedger, Status};
use crate::scope::{PairwiseScope, ScopeRegistry};
use crate::table::{ResourceTable, TableScope};
use crate::{GLOBAL_RESOURCE_TABLE, LOCAL_RESOURCE_TABLE};

/// What a classified misbehavior cost the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisbehaviorReport {
    pub principal: String,
    pub kind: MisbehaviorKind,
    /// Always > 0.
    #[serde(with = "warden_audit::amount")]
    pub penalty_amount: u128,
    /// What the ledger actually gave up (clamped at the balance).
    #[serde(with = "warden_audit::amount")]
    pub burned: u128,
    pub blocking_end: DateTime<Utc>,
}

/// Result of an operation that screens its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Outcome<T> {
    Completed(T),
    /// The caller is inside a blocking window. Nothing was evaluated.
    Blocked { until: DateTime<Utc> },
    Misbehavior(MisbehaviorReport),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn misbehavior(&self) -> Option<&MisbehaviorReport> {
        match self {
            Outcome::Misbehavior(report) => Some(report),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Blocked { until } => Outcome::Blocked { until },
            Outcome::Misbehavior(report) => Outcome::Misbehavior(report),
        }
    }
}

/// Member-status accessor view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStatus {
    pub name: String,
    pub group: String,
    pub role: Role,
    pub status: Status,
    pub last_status_update: Option<DateTime<Utc>>,
}

/// Which policy table an attempt is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeRef {
    Table,
    Pairwise(u64),
}

impl ScopeRef {
    fn from_id(scope_id: Option<u64>) -> Self {
        scope_id.map(ScopeRef::Pairwise).unwrap_or(ScopeRef::Table)
    }
}

struct Attempt<'a> {
    scope: ScopeRef,
    principal: &'a str,
    resource: &'a str,
    action: &'a Action,
    gate: Gate,
    roster_target: Option<Role>,
}

enum Halt {
    Blocked { until: DateTime<Utc> },
    Misbehavior(MisbehaviorReport),
}

impl<T> From<Halt> for Outcome<T> {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Blocked { until } => Outcome::Blocked { until },
            Halt::Misbehavior(report) => Outcome::Misbehavior(report),
        }
    }
}

enum Screened {
    Proceed(Evaluation),
    Halt(Halt),
}

pub struct AccessControlSystem {
    admin: String,
    config: WardenConfig,
    registry: Arc<dyn IdentityRegistry>,
    clock: Arc<dyn Clock>,
    classifier: BehaviorClassifier,
    incentives: IncentiveEngine,
    reputation: ReputationLedger,
    table: TableScope,
    scopes: ScopeRegistry,
    journal: Journal,
    dispatcher: EventDispatcher,
    pending: Vec<AccessEvent>,
}

impl AccessControlSystem {
    /// Build a system administered by `admin`, who must be registered as an
    /// Admin. The Global roster is seeded with every registered member.
    pub fn new(
        admin: &str,
        config: WardenConfig,
        registry: Arc<dyn IdentityRegistry>,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AccessError> {
        config.validate()?;
        match registry.role(admin) {
            Role::Admin => {}
            Role::None => return Err(AccessError::unregistered(admin)),
            actual => {
                return Err(AccessError::IncorrectRole {
                    caller: admin.to_string(),
                    required: Role::Admin,
                    actual,
                })
            }
        }

        let table = TableScope::new(admin, registry.members());
        Ok(Self {
            admin: admin.to_string(),
            classifier: BehaviorClassifier::new(config.classifier.cooldown()),
            incentives: IncentiveEngine::new(ledger, config.incentives.clone()),
            config,
            registry,
            clock,
            reputation: ReputationLedger::new(),
            table,
            scopes: ScopeRegistry::new(),
            journal: Journal::new(),
            dispatcher: EventDispatcher::new(),
            pending: Vec::new(),
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.dispatcher.add_sink(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.dispatcher.add_sink(sink);
    }

    /// Mint every registered member's initial allocation. Returns the total.
    pub fn allocate_initial_balances(&self) -> u128 {
        self.registry
            .members()
            .iter()
            .map(|m| self.incentives.allocate_initial(m))
            .sum()
    }

    // ── Policy ────────────────────────────────────────────────────

    /// Write a rule into the table scope (`scope_id == None`) or a pairwise scope.
    pub fn add_policy(
        &mut self,
        caller: &str,
        scope_id: Option<u64>,
        role: Role,
        resource: &str,
        action: Action,
        permission: Permission,
    ) -> Result<Option<Permission>, AccessError> {
        self.run("policy_add", caller, |s, _| {
            let caller_role = s.registered_role(caller)?;
            let store = s.policy_store_mut(ScopeRef::from_id(scope_id))?;
            let replaced =
                store.policy_add(caller, caller_role, role, resource, action.clone(), permission)?;
            tracing::debug!(author = caller, ?scope_id, %role, resource, %action, %permission, "policy written");
            s.pending.push(AccessEvent::PolicyAdded {
                scope_id,
                author: caller.to_string(),
                role,
                resource: resource.to_string(),
                action,
                permission,
            });
            Ok(replaced)
        })
    }

    pub fn policy_lookup(
        &self,
        scope_id: Option<u64>,
        role: Role,
        resource: &str,
        action: &Action,
    ) -> Result<PolicyLookup, AccessError> {
        Ok(self
            .policy_store(ScopeRef::from_id(scope_id))?
            .lookup(role, resource, action))
    }

    // ── Pairwise scopes ───────────────────────────────────────────

    /// Bind (subject, object, resource_kind) to a new scope created by
    /// `subject`. Principals of different groups may only share a scope over
    /// a shared namespace.
    pub fn deploy_scope(
        &mut self,
        caller: &str,
        subject: &str,
        object: &str,
        resource_kind: &str,
    ) -> Result<u64, AccessError> {
        self.run("deploy_scope", caller, |s, _| {
            let caller_role = s.registered_role(caller)?;
            if caller_role != Role::Admin && caller != subject && caller != object {
                return Err(AccessError::not_authorized(caller, "deploy this scope"));
            }
            let subject_member = s
                .registry
                .member(subject)
                .ok_or_else(|| AccessError::unregistered(subject))?;
            let object_member = s
                .registry
                .member(object)
                .ok_or_else(|| AccessError::unregistered(object))?;
            if !subject_member.same_group(&object_member)
                && !s.config.scopes.is_shared(resource_kind)
            {
                return Err(AccessError::GroupMismatch {
                    subject: subject.to_string(),
                    subject_group: subject_member.group,
                    object: object.to_string(),
                    object_group: object_member.group,
                });
            }

            let scope_id = s.scopes.deploy(subject, object, resource_kind)?;
            tracing::info!(scope_id, subject, object, resource_kind, "scope deployed");
            s.pending.push(AccessEvent::ScopeDeployed {
                scope_id,
                subject: subject.to_string(),
                object: object.to_string(),
                resource_kind: resource_kind.to_string(),
            });
            Ok(scope_id)
        })
    }

    pub fn scope_id(&self, subject: &str, object: &str, resource_kind: &str) -> Option<u64> {
        self.scopes.scope_id(subject, object, resource_kind)
    }

    pub fn scope(&self, scope_id: u64) -> Result<&PairwiseScope, AccessError> {
        self.scopes.get(scope_id)
    }

    pub fn activate_scope(&mut self, caller: &str, scope_id: u64) -> Result<Outcome<()>, AccessError> {
        self.set_scope_active(caller, scope_id, true)
    }

    /// Only the scope's creator or an admin may do this; anyone else is
    /// reported for DenialOfService.
    pub fn deactivate_scope(&mut self, caller: &str, scope_id: u64) -> Result<Outcome<()>, AccessError> {
        self.set_scope_active(caller, scope_id, false)
    }

    fn set_scope_active(
        &mut self,
        caller: &str,
        scope_id: u64,
        active: bool,
    ) -> Result<Outcome<()>, AccessError> {
        let (operation, action) = if active {
            ("activate_scope", Action::Activate)
        } else {
            ("deactivate_scope", Action::Deactivate)
        };
        self.run(operation, caller, |s, at| {
            if let Some(halt) = s.blocked(caller, at) {
                return Ok(halt.into());
            }
            let scope = s.scopes.get(scope_id)?;
            let is_controller = scope.is_controller(caller, s.registry.role(caller));
            let resource = scope.resource_kind.clone();

            let attempt = Attempt {
                scope: ScopeRef::Pairwise(scope_id),
                principal: caller,
                resource: &resource,
                action: &action,
                gate: Gate::Controller { is_controller },
                roster_target: None,
            };
            if let Screened::Halt(halt) = s.screen(&attempt, at)? {
                return Ok(halt.into());
            }

            s.scopes.get_mut(scope_id)?.active = active;
            tracing::info!(scope_id, by = caller, active, "scope lifecycle changed");
            s.pending.push(if active {
                AccessEvent::ScopeActivated {
                    scope_id,
                    by: caller.to_string(),
                }
            } else {
                AccessEvent::ScopeDeactivated {
                    scope_id,
                    by: caller.to_string(),
                }
            });
            Ok(Outcome::Completed(()))
        })
    }

    /// Evaluate and classify an access attempt inside a pairwise scope.
    pub fn access_control(
        &mut self,
        caller: &str,
        scope_id: u64,
        resource: &str,
        action: Action,
    ) -> Result<Outcome<()>, AccessError> {
        self.run("access_control", caller, |s, at| {
            if let Some(halt) = s.blocked(caller, at) {
                return Ok(halt.into());
            }
            s.scopes.active(scope_id)?;
            let attempt = Attempt {
                scope: ScopeRef::Pairwise(scope_id),
                principal: caller,
                resource,
                action: &action,
                gate: Gate::Policy,
                roster_target: None,
            };
            let allowed = match s.screen(&attempt, at)? {
                Screened::Proceed(_) => true,
                Screened::Halt(Halt::Misbehavior(report)) => {
                    s.push_access_checked(scope_id, caller, resource, &action, false);
                    return Ok(Outcome::Misbehavior(report));
                }
                Screened::Halt(halt) => return Ok(halt.into()),
            };
            s.push_access_checked(scope_id, caller, resource, &action, allowed);
            Ok(Outcome::Completed(()))
        })
    }

    fn push_access_checked(
        &mut self,
        scope_id: u64,
        principal: &str,
        resource: &str,
        action: &Action,
        allowed: bool,
    ) {
        self.pending.push(AccessEvent::AccessControlChecked {
            scope_id,
            principal: principal.to_string(),
            resource: resource.to_string(),
            action: action.clone(),
            allowed,
        });
    }

    // ── Collective requests ───────────────────────────────────────

    /// Open a quorum request for (resource, action). The caller must hold an
    /// Allow rule for it; any misbehavior classification means no request.
    pub fn create_access_request(
        &mut self,
        caller: &str,
        resource: &str,
        action: Action,
    ) -> Result<Outcome<u64>, AccessError> {
        self.run("create_access_request", caller, |s, at| {
            let attempt = Attempt {
                scope: ScopeRef::Table,
                principal: caller,
                resource,
                action: &action,
                gate: Gate::Policy,
                roster_target: None,
            };
            let eval = match s.screen(&attempt, at)? {
                Screened::Proceed(eval) => eval,
                Screened::Halt(halt) => return Ok(halt.into()),
            };

            let heads = s.registry.count_with_role(Role::PrimaryHead);
            let required_quorum = s.config.quorum.required(heads);
            let endorsed = eval.role == Role::PrimaryHead;
            let request = s.table.requests.create(
                caller,
                resource,
                action.clone(),
                required_quorum,
                endorsed,
                at,
            );
            let (id, approved) = (request.id, request.is_approved());

            tracing::info!(id, requester = caller, resource, %action, required_quorum, "access request created");
            s.pending.push(AccessEvent::AccessRequestCreated {
                id,
                requester: caller.to_string(),
                resource: resource.to_string(),
                action,
                required_quorum,
            });
            if approved {
                s.pending.push(AccessEvent::AccessGranted {
                    id,
                    requester: caller.to_string(),
                });
            }
            Ok(Outcome::Completed(id))
        })
    }

    /// A PrimaryHead's vote. `approve == false` is an abstention and records
    /// nothing. Returns whether the request is approved afterwards.
    pub fn handle_access_request(
        &mut self,
        caller: &str,
        id: u64,
        approve: bool,
    ) -> Result<bool, AccessError> {
        self.run("handle_access_request", caller, |s, at| {
            let role = s.registered_role(caller)?;
            if role != Role::PrimaryHead {
                return Err(AccessError::IncorrectRole {
                    caller: caller.to_string(),
                    required: Role::PrimaryHead,
                    actual: role,
                });
            }
            if !approve {
                let request = s.table.requests.get(id)?;
                tracing::debug!(id, voter = caller, "abstained");
                return Ok(request.is_approved());
            }

            let vote = s.table.requests.vote(id, caller, at)?;
            s.pending.push(AccessEvent::AccessVoteRecorded {
                id,
                voter: caller.to_string(),
                approvals: vote.approvals,
                required_quorum: vote.required_quorum,
            });
            if vote.newly_approved {
                let requester = s.table.requests.get(id)?.requester.clone();
                tracing::info!(id, %requester, approvals = vote.approvals, "access granted");
                s.pending.push(AccessEvent::AccessGranted { id, requester });
            }
            Ok(vote.approvals >= vote.required_quorum)
        })
    }

    /// Admin-only: withdraw the grant an approved request gives.
    pub fn revoke_access_request(&mut self, caller: &str, id: u64) -> Result<(), AccessError> {
        self.run("revoke_access_request", caller, |s, _| {
            s.require_admin(caller, "revoke access requests")?;
            if s.table.requests.revoke(id)? {
                tracing::info!(id, by = caller, "access request revoked");
                s.pending.push(AccessEvent::AccessRequestRevoked {
                    id,
                    revoked_by: caller.to_string(),
                });
            }
            Ok(())
        })
    }

    pub fn request(&self, id: u64) -> Result<&AccessRequest, AccessError> {
        self.table.requests.get(id)
    }

    pub fn requests(&self) -> &[AccessRequest] {
        self.table.requests.requests()
    }

    // ── Resource tables ───────────────────────────────────────────

    /// Needs an Allow rule for viewing the Global table or an approved request.
    pub fn view_global_resource_table(
        &mut self,
        caller: &str,
    ) -> Result<Outcome<Vec<Member>>, AccessError> {
        self.run("view_global_resource_table", caller, |s, at| {
            if let Screened::Halt(halt) = s.screen_view(caller, GLOBAL_RESOURCE_TABLE, at)? {
                return Ok(halt.into());
            }
            let snapshot = s.table.roster.snapshot();
            s.pending.push(AccessEvent::GlobalResourceTableViewed {
                viewer: caller.to_string(),
                snapshot: snapshot.clone(),
            });
            Ok(Outcome::Completed(snapshot))
        })
    }

    /// The caller's own group slice of the roster.
    pub fn view_local_resource_table(
        &mut self,
        caller: &str,
    ) -> Result<Outcome<Vec<Member>>, AccessError> {
        self.run("view_local_resource_table", caller, |s, at| {
            if let Screened::Halt(halt) = s.screen_view(caller, LOCAL_RESOURCE_TABLE, at)? {
                return Ok(halt.into());
            }
            let group = s.registry.group(caller).unwrap_or_default();
            let snapshot = s.table.roster.local_snapshot(&group);
            s.pending.push(AccessEvent::LocalResourceTableViewed {
                viewer: caller.to_string(),
                group,
                snapshot: snapshot.clone(),
            });
            Ok(Outcome::Completed(snapshot))
        })
    }

    fn screen_view(
        &mut self,
        caller: &str,
        table: &str,
        at: DateTime<Utc>,
    ) -> Result<Screened, AccessError> {
        let approved = self
            .table
            .requests
            .has_approved(caller, table, &Action::View);
        let attempt = Attempt {
            scope: ScopeRef::Table,
            principal: caller,
            resource: table,
            action: &Action::View,
            gate: Gate::PolicyOrApproval { approved },
            roster_target: None,
        };
        self.screen(&attempt, at)
    }

    /// Replace `old`'s roster entry with `new`'s registry record. Needs an
    /// Allow rule, an approved edit request, and a caller who outranks both.
    pub fn edit_global_resource_table(
        &mut self,
        caller: &str,
        old: &str,
        new: &str,
    ) -> Result<Outcome<()>, AccessError> {
        self.run("edit_global_resource_table", caller, |s, at| {
            if let Some(halt) = s.blocked(caller, at) {
                return Ok(halt.into());
            }
            let old_role = s.table.roster.entry(old)?.role;
            let replacement = s
                .registry
                .member(new)
                .ok_or_else(|| AccessError::unregistered(new))?;
            if new != old && s.table.roster.contains(new) {
                return Err(AccessError::RosterEntryExists {
                    principal: new.to_string(),
                });
            }
            let target = if old_role.rank() >= replacement.role.rank() {
                old_role
            } else {
                replacement.role
            };

            if let Screened::Halt(halt) = s.screen_mutation(caller, Action::Edit, target, at)? {
                return Ok(halt.into());
            }

            s.table.roster.replace(old, replacement)?;
            tracing::info!(editor = caller, old, new, "global resource table edited");
            s.pending.push(AccessEvent::GlobalResourceTableEdited {
                editor: caller.to_string(),
                old: old.to_string(),
                new: new.to_string(),
            });
            Ok(Outcome::Completed(()))
        })
    }

    pub fn delete_global_resource_table(
        &mut self,
        caller: &str,
        target: &str,
    ) -> Result<Outcome<()>, AccessError> {
        self.run("delete_global_resource_table", caller, |s, at| {
            if let Some(halt) = s.blocked(caller, at) {
                return Ok(halt.into());
            }
            let target_role = s.table.roster.entry(target)?.role;

            if let Screened::Halt(halt) = s.screen_mutation(caller, Action::Delete, target_role, at)? {
                return Ok(halt.into());
            }

            s.table.roster.remove(target)?;
            tracing::info!(deleter = caller, target, "global resource table entry deleted");
            s.pending.push(AccessEvent::GlobalResourceTableEntryDeleted {
                deleter: caller.to_string(),
                target: target.to_string(),
            });
            Ok(Outcome::Completed(()))
        })
    }

    fn screen_mutation(
        &mut self,
        caller: &str,
        action: Action,
        target: Role,
        at: DateTime<Utc>,
    ) -> Result<Screened, AccessError> {
        let approved = self
            .table
            .requests
            .has_approved(caller, GLOBAL_RESOURCE_TABLE, &action);
        let attempt = Attempt {
            scope: ScopeRef::Table,
            principal: caller,
            resource: GLOBAL_RESOURCE_TABLE,
            action: &action,
            gate: Gate::PolicyAndApproval { approved },
            roster_target: Some(target),
        };
        self.screen(&attempt, at)
    }

    pub fn roster(&self) -> &ResourceTable {
        &self.table.roster
    }

    // ── Membership & reputation ───────────────────────────────────

    /// Admin-only: remove a member from the registry along with its reputation.
    pub fn revoke_member(&mut self, caller: &str, target: &str) -> Result<(), AccessError> {
        self.run("revoke_member", caller, |s, _| {
            s.require_admin(caller, "revoke members")?;
            if target == s.admin {
                return Err(AccessError::not_authorized(caller, "revoke the system admin"));
            }
            s.registry
                .revoke(target)
                .ok_or_else(|| AccessError::unregistered(target))?;
            s.reputation.remove(target);
            tracing::info!(member = target, by = caller, "member revoked");
            s.pending.push(AccessEvent::MemberRevoked {
                member: target.to_string(),
                by: caller.to_string(),
            });
            Ok(())
        })
    }

    /// `(blocking_end, is_blocked)` for `principal`. Readable by the
    /// principal itself or an admin.
    pub fn get_time(
        &self,
        caller: &str,
        principal: &str,
    ) -> Result<(Option<DateTime<Utc>>, bool), AccessError> {
        if caller != principal && self.registry.role(caller) != Role::Admin {
            return Err(AccessError::not_authorized(caller, "read another member's blocking time"));
        }
        Ok(self.reputation.get_time(principal, self.clock.now()))
    }

    pub fn status(&self, principal: &str) -> Status {
        self.reputation.status(principal, self.clock.now())
    }

    pub fn member_status(&self, principal: &str) -> Option<MemberStatus> {
        let member = self.registry.member(principal)?;
        let now = self.clock.now();
        let last_status_update = self
            .reputation
            .record(principal)
            .and_then(|r| r.last_status_update(now));
        Some(MemberStatus {
            name: member.name,
            group: member.group,
            role: member.role,
            status: self.reputation.status(principal, now),
            last_status_update,
        })
    }

    pub fn reputation(&self) -> &ReputationLedger {
        &self.reputation
    }

    pub fn balance_of(&self, account: &str) -> u128 {
        self.incentives.balance_of(account)
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn admin(&self) -> &str {
        &self.admin
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── Internals ─────────────────────────────────────────────────

    fn run<T>(
        &mut self,
        operation: &str,
        principal: &str,
        f: impl FnOnce(&mut Self, DateTime<Utc>) -> Result<T, AccessError>,
    ) -> Result<T, AccessError> {
        let at = self.clock.now();
        self.pending.clear();
        let result = f(self, at);
        let events = std::mem::take(&mut self.pending);
        let value = result?;

        self.journal.record(at, operation, principal, events.clone())?;
        for event in &events {
            self.dispatcher.dispatch(event, at);
        }
        Ok(value)
    }

    fn blocked(&self, caller: &str, at: DateTime<Utc>) -> Option<Halt> {
        let until = self.reputation.blocked_until(caller, at)?;
        tracing::debug!(principal = caller, %until, "operation attempted while blocked");
        Some(Halt::Blocked { until })
    }

    fn screen(&mut self, attempt: &Attempt<'_>, at: DateTime<Utc>) -> Result<Screened, AccessError> {
        let policies = self.policy_store(attempt.scope)?;
        let evaluated = AccessEvaluator::new(self.registry.as_ref(), &self.reputation).evaluate(
            policies,
            attempt.principal,
            attempt.resource,
            attempt.action,
            attempt.gate,
            at,
        )?;
        let eval = match evaluated {
            Evaluated::Blocked { until } => return Ok(Screened::Halt(Halt::Blocked { until })),
            Evaluated::Decided(eval) => eval,
        };

        let verdict = self.classifier.classify(&ClassifierInput {
            evaluation: &eval,
            is_controller: self.is_controller(attempt.scope, attempt.principal, eval.role)?,
            roster_target: attempt.roster_target,
            resource_known: policies.knows_resource(attempt.resource),
            last_activity: self.reputation.last_activity(attempt.principal),
        });

        if eval.lookup == PolicyLookup::NotFound {
            self.pending.push(AccessEvent::PolicyNotFoundForAccessControl {
                resource: eval.resource.clone(),
                action: eval.action.clone(),
            });
        }

        match verdict {
            Verdict::Misbehavior(kind) => {
                let report = self.punish(&eval, kind);
                Ok(Screened::Halt(Halt::Misbehavior(report)))
            }
            Verdict::Benign => {
                self.note_benign(&eval);
                Ok(Screened::Proceed(eval))
            }
        }
    }

    fn punish(&mut self, eval: &Evaluation, kind: MisbehaviorKind) -> MisbehaviorReport {
        let window = self.config.blocking.window(kind);
        let blocking_end = self
            .reputation
            .record_misbehavior(&eval.principal, eval.at, window);
        let penalty_amount = self.incentives.penalty_for(kind, eval.role);
        let burned = self.incentives.burn(&eval.principal, penalty_amount);

        tracing::info!(
            principal = %eval.principal,
            reason = kind.reason(),
            resource = %eval.resource,
            action = %eval.action,
            %penalty_amount,
            %burned,
            %blocking_end,
            "malicious activity reported"
        );
        self.pending.push(AccessEvent::MaliciousActivityReported {
            principal: eval.principal.clone(),
            reason: kind.reason().to_string(),
            penalty_amount,
            blocking_end,
        });

        MisbehaviorReport {
            principal: eval.principal.clone(),
            kind,
            penalty_amount,
            burned,
            blocking_end,
        }
    }

    fn note_benign(&mut self, eval: &Evaluation) {
        tracing::debug!(
            principal = %eval.principal,
            resource = %eval.resource,
            action = %eval.action,
            "access allowed"
        );
        let threshold = self.config.incentives.reward_threshold();
        if !self
            .reputation
            .record_benign(&eval.principal, eval.at, threshold)
        {
            return;
        }
        if let Some(amount) = self.incentives.reward(&eval.principal, eval.role) {
            tracing::info!(principal = %eval.principal, %amount, "benign behavior rewarded");
            self.pending.push(AccessEvent::BenignBehaviorRewarded {
                principal: eval.principal.clone(),
                amount,
            });
        }
    }

    fn policy_store(&self, scope: ScopeRef) -> Result<&PolicyStore, AccessError> {
        match scope {
            ScopeRef::Table => Ok(&self.table.policies),
            ScopeRef::Pairwise(id) => Ok(&self.scopes.get(id)?.policies),
        }
    }

    fn policy_store_mut(&mut self, scope: ScopeRef) -> Result<&mut PolicyStore, AccessError> {
        match scope {
            ScopeRef::Table => Ok(&mut self.table.policies),
            ScopeRef::Pairwise(id) => Ok(&mut self.scopes.get_mut(id)?.policies),
        }
    }

    fn is_controller(&self, scope: ScopeRef, caller: &str, role: Role) -> Result<bool, AccessError> {
        match scope {
            ScopeRef::Table => Ok(caller == self.admin || role == Role::Admin),
            ScopeRef::Pairwise(id) => Ok(self.scopes.get(id)?.is_controller(caller, role)),
        }
    }

    fn registered_role(&self, principal: &str) -> Result<Role, AccessError> {
        let role = self.registry.role(principal);
        if role.is_registered() {
            Ok(role)
        } else {
            Err(AccessError::unregistered(principal))
        }
    }

    fn require_admin(&self, caller: &str, operation: &str) -> Result<(), AccessError> {
        if self.registered_role(caller)? != Role::Admin {
            return Err(AccessError::not_authorized(caller, operation));
        }
        Ok(())
    }
}
