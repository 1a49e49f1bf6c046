// evaluator.rs — Resolves an access attempt to Allowed or Denied.
//
// Order of checks:
//   1. Caller blocked?            → Evaluated::Blocked (nothing else happens)
//   2. Caller registered?         → AccessError::UnregisteredPrincipal
//   3. Policy lookup, then the operation's gate turns it into a decision.
//
// The evaluator does not classify or mutate anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_policy::{Action, PolicyLookup, PolicyStore, Role};

use crate::error::AccessError;
use crate::registry::IdentityRegistry;
use crate::reputation::ReputationLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allowed
    }
}

/// How an operation combines the policy lookup with its own grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Plain policy: only an explicit Allow passes.
    Policy,
    /// Table views: an Allow rule or an approved request.
    PolicyOrApproval { approved: bool },
    /// Table mutations: an Allow rule and an approved request.
    PolicyAndApproval { approved: bool },
    /// Scope lifecycle: only the scope's controller passes.
    Controller { is_controller: bool },
}

impl Gate {
    pub fn decide(self, lookup: PolicyLookup) -> Decision {
        let allowed = match self {
            Gate::Policy => lookup.is_allow(),
            Gate::PolicyOrApproval { approved } => lookup.is_allow() || approved,
            Gate::PolicyAndApproval { approved } => lookup.is_allow() && approved,
            Gate::Controller { is_controller } => is_controller,
        };
        if allowed {
            Decision::Allowed
        } else {
            Decision::Denied
        }
    }
}

/// A decided access attempt, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub principal: String,
    pub role: Role,
    pub resource: String,
    pub action: Action,
    pub lookup: PolicyLookup,
    pub decision: Decision,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluated {
    Blocked { until: DateTime<Utc> },
    Decided(Evaluation),
}

pub struct AccessEvaluator<'a> {
    registry: &'a dyn IdentityRegistry,
    reputation: &'a ReputationLedger,
}

impl<'a> AccessEvaluator<'a> {
    pub fn new(registry: &'a dyn IdentityRegistry, reputation: &'a ReputationLedger) -> Self {
        Self {
            registry,
            reputation,
        }
    }

    pub fn evaluate(
        &self,
        policies: &PolicyStore,
        principal: &str,
        resource: &str,
        action: &Action,
        gate: Gate,
        at: DateTime<Utc>,
    ) -> Result<Evaluated, AccessError> {
        if let Some(until) = self.reputation.blocked_until(principal, at) {
            tracing::debug!(principal, %until, "access attempt while blocked");
            return Ok(Evaluated::Blocked { until });
        }

        let role = self.registry.role(principal);
        if !role.is_registered() {
            return Err(AccessError::unregistered(principal));
        }

        let lookup = policies.lookup(role, resource, action);
        let decision = gate.decide(lookup);

        Ok(Evaluated::Decided(Evaluation {
            principal: principal.to_string(),
            role,
            resource: resource.to_string(),
            action: action.clone(),
            lookup,
            decision,
            at,
        }))
    }
}
