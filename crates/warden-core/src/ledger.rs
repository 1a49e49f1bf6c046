// ledger.rs — The token ledger Warden burns from and mints into.
//
// Balances and transfers belong to the ledger, not to Warden. The in-memory
// ledger is strict: burning more than the balance fails. The incentive
// engine clamps before burning so misbehavior reports never fail.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account '{account}' holds {balance}, cannot burn {requested}")]
    InsufficientBalance {
        account: String,
        balance: u128,
        requested: u128,
    },

    #[error("minting {amount} into '{account}' overflows its balance")]
    Overflow { account: String, amount: u128 },
}

pub trait TokenLedger: Send + Sync {
    fn balance_of(&self, account: &str) -> u128;

    fn burn(&self, account: &str, amount: u128) -> Result<(), LedgerError>;

    fn mint(&self, account: &str, amount: u128) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: Mutex<BTreeMap<String, u128>>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.lock().values().sum()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, u128>> {
        self.balances.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, account: &str) -> u128 {
        self.lock().get(account).copied().unwrap_or(0)
    }

    fn burn(&self, account: &str, amount: u128) -> Result<(), LedgerError> {
        let mut balances = self.lock();
        let balance = balances.get(account).copied().unwrap_or(0);
        if amount > balance {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                balance,
                requested: amount,
            });
        }
        balances.insert(account.to_string(), balance - amount);
        Ok(())
    }

    fn mint(&self, account: &str, amount: u128) -> Result<(), LedgerError> {
        let mut balances = self.lock();
        let balance = balances.entry(account.to_string()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| LedgerError::Overflow {
            account: account.to_string(),
            amount,
        })?;
        Ok(())
    }
}
