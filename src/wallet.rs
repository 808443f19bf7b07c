use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::UserId;

/// one user wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Money,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// create with zero balance
    pub fn new(user_id: UserId, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: Money::ZERO,
            updated_at: timestamp,
        }
    }
}

/// wallet ledger applying balance changes through the store
#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn DocumentStore>,
}

impl WalletLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// withdraw from a user wallet, failing closed when the balance is short
    pub fn debit(
        &self,
        user_id: UserId,
        amount: Money,
        reason: &str,
        time: &SafeTimeProvider,
    ) -> Result<Money> {
        if !amount.is_positive() {
            return Err(LendingError::InvalidAmount { amount });
        }
        let now = time.now();
        let updated = self
            .store
            .update(collections::WALLETS, &user_id.to_string(), &mut |doc| {
                // a user without a wallet has nothing to debit
                let mut wallet = match doc {
                    Some(doc) => from_document::<Wallet>(doc)?,
                    None => Wallet::new(user_id, now),
                };
                if amount > wallet.balance {
                    return Err(LendingError::InsufficientFunds {
                        available: wallet.balance,
                        requested: amount,
                    });
                }
                wallet.balance -= amount;
                wallet.updated_at = now;
                to_document(&wallet)
            })?;

        let wallet: Wallet = from_document(updated)?;
        debug!(
            user_id = %user_id,
            amount = %amount,
            balance = %wallet.balance,
            reason,
            "wallet debited"
        );
        Ok(wallet.balance)
    }

    /// deposit into a user wallet, creating it on first use
    pub fn credit(
        &self,
        user_id: UserId,
        amount: Money,
        reason: &str,
        time: &SafeTimeProvider,
    ) -> Result<Money> {
        if !amount.is_positive() {
            return Err(LendingError::InvalidAmount { amount });
        }
        let now = time.now();
        let updated = self
            .store
            .update(collections::WALLETS, &user_id.to_string(), &mut |doc| {
                let mut wallet = match doc {
                    Some(doc) => from_document::<Wallet>(doc)?,
                    None => Wallet::new(user_id, now),
                };
                wallet.balance += amount;
                wallet.updated_at = now;
                to_document(&wallet)
            })?;

        let wallet: Wallet = from_document(updated)?;
        debug!(
            user_id = %user_id,
            amount = %amount,
            balance = %wallet.balance,
            reason,
            "wallet credited"
        );
        Ok(wallet.balance)
    }

    /// current balance, zero for a wallet never credited
    pub fn balance(&self, user_id: UserId) -> Result<Money> {
        match self.store.get(collections::WALLETS, &user_id.to_string())? {
            Some(doc) => Ok(from_document::<Wallet>(doc)?.balance),
            None => Ok(Money::ZERO),
        }
    }
}
