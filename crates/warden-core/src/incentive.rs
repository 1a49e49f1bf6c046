// incentive.rs — Penalties and rewards, paid through the token ledger.
//
// Penalty = base(kind) × weight(role) × 10^decimals, never below one base
// unit. Burns are clamped to the current balance and never fail: a ledger
// error is logged and reported as zero burned, and the misbehavior report
// goes out regardless.

use std::sync::Arc;

use warden_policy::{Member, Role};

use crate::classifier::MisbehaviorKind;
use crate::config::IncentiveConfig;
use crate::ledger::TokenLedger;

pub struct IncentiveEngine {
    ledger: Arc<dyn TokenLedger>,
    config: IncentiveConfig,
}

impl IncentiveEngine {
    pub fn new(ledger: Arc<dyn TokenLedger>, config: IncentiveConfig) -> Self {
        Self { ledger, config }
    }

    pub fn config(&self) -> &IncentiveConfig {
        &self.config
    }

    pub fn balance_of(&self, account: &str) -> u128 {
        self.ledger.balance_of(account)
    }

    fn weight(&self, role: Role) -> u128 {
        // Unregistered principals never reach here; weigh them as members.
        let weight = match role {
            Role::None => self.config.role_weights.get(Role::RegularMember),
            other => self.config.role_weights.get(other),
        };
        u128::from(weight)
    }

    pub fn penalty_for(&self, kind: MisbehaviorKind, role: Role) -> u128 {
        u128::from(self.config.base_penalty.get(kind))
            .saturating_mul(self.weight(role))
            .saturating_mul(self.config.unit())
            .max(1)
    }

    pub fn reward_for(&self, role: Role) -> u128 {
        u128::from(self.config.base_reward)
            .saturating_mul(self.weight(role))
            .saturating_mul(self.config.unit())
    }

    /// Burn up to `amount` from `account`. Returns what was actually burned.
    pub fn burn(&self, account: &str, amount: u128) -> u128 {
        let burnable = amount.min(self.ledger.balance_of(account));
        if burnable == 0 {
            return 0;
        }
        match self.ledger.burn(account, burnable) {
            Ok(()) => burnable,
            Err(e) => {
                tracing::warn!(account, "penalty burn failed: {}", e);
                0
            }
        }
    }

    /// Pay the benign-streak reward. `None` when nothing was minted.
    pub fn reward(&self, account: &str, role: Role) -> Option<u128> {
        let amount = self.reward_for(role);
        if amount == 0 {
            return None;
        }
        match self.ledger.mint(account, amount) {
            Ok(()) => Some(amount),
            Err(e) => {
                tracing::warn!(account, "reward mint failed: {}", e);
                None
            }
        }
    }

    /// Fund a member with its role's initial allocation. Returns the amount.
    pub fn allocate_initial(&self, member: &Member) -> u128 {
        let amount =
            u128::from(self.config.initial_allocation.get(member.role)).saturating_mul(self.config.unit());
        if amount == 0 {
            return 0;
        }
        match self.ledger.mint(&member.id, amount) {
            Ok(()) => amount,
            Err(e) => {
                tracing::warn!(member = %member.id, "initial allocation failed: {}", e);
                0
            }
        }
    }
}
