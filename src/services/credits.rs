//! Sending credits.
//!
//! Balances live in the database; this side only asks for a deduction
//! before a batch goes out.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;

#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Take `amount` credits. `Ok(false)` means the balance was too low.
    async fn deduct(&self, user_id: Uuid, amount: i64) -> Result<bool>;
}

pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn deduct(&self, user_id: Uuid, amount: i64) -> Result<bool> {
        queries::credits::deduct_credits(&self.pool, user_id, amount).await
    }
}

/// Never refuses. Used when running without a credit system and in tests.
pub struct UnlimitedCredits;

#[async_trait]
impl CreditLedger for UnlimitedCredits {
    async fn deduct(&self, _user_id: Uuid, _amount: i64) -> Result<bool> {
        Ok(true)
    }
}

/// Fixed balances held in memory (tests).
#[derive(Default)]
pub struct FakeCreditLedger {
    balances: Mutex<HashMap<Uuid, i64>>,
}

impl FakeCreditLedger {
    pub fn with_balance(user_id: Uuid, balance: i64) -> Self {
        let ledger = Self::default();
        ledger.balances.lock().insert(user_id, balance);
        ledger
    }

    pub fn balance(&self, user_id: Uuid) -> i64 {
        self.balances.lock().get(&user_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CreditLedger for FakeCreditLedger {
    async fn deduct(&self, user_id: Uuid, amount: i64) -> Result<bool> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(user_id).or_insert(0);
        if *balance < amount {
            return Ok(false);
        }
        *balance -= amount;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_ledger_refuses_overdraft_without_changing_balance() {
        let user = Uuid::new_v4();
        let ledger = FakeCreditLedger::with_balance(user, 3);

        assert!(ledger.deduct(user, 2).await.unwrap());
        assert_eq!(ledger.balance(user), 1);
        assert!(!ledger.deduct(user, 2).await.unwrap());
        assert_eq!(ledger.balance(user), 1);
    }

    #[tokio::test]
    async fn unlimited_always_allows() {
        assert!(UnlimitedCredits.deduct(Uuid::new_v4(), 1_000_000).await.unwrap());
    }
}
