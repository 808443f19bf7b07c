use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::{EscrowId, EscrowStatus, LoanId, UserId};
use crate::wallet::WalletLedger;

/// funds held between lender commitment and resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub loan_id: LoanId,
    pub lender_id: UserId,
    pub borrower_id: UserId,
    /// immutable once opened
    pub amount: Money,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Escrow {
    pub fn new(
        loan_id: LoanId,
        lender_id: UserId,
        borrower_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            lender_id,
            borrower_id,
            amount,
            status: EscrowStatus::Pending,
            created_at: timestamp,
            resolved_at: None,
        }
    }

    /// check the transition table without applying it
    pub fn can_transition_to(&self, next: EscrowStatus) -> bool {
        matches!(
            (self.status, next),
            (EscrowStatus::Pending, EscrowStatus::Approved)
                | (EscrowStatus::Pending, EscrowStatus::Released)
                | (EscrowStatus::Pending, EscrowStatus::Refunded)
                | (EscrowStatus::Approved, EscrowStatus::Released)
                | (EscrowStatus::Approved, EscrowStatus::Refunded)
        )
    }
}

/// escrow ledger owning the held-funds records and their money movement
#[derive(Clone)]
pub struct EscrowLedger {
    store: Arc<dyn DocumentStore>,
    wallets: WalletLedger,
}

impl EscrowLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            wallets: WalletLedger::new(store.clone()),
            store,
        }
    }

    /// hold funds for a loan, starting in pending
    pub fn open(
        &self,
        loan_id: LoanId,
        lender_id: UserId,
        borrower_id: UserId,
        amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<Escrow> {
        if !amount.is_positive() {
            return Err(LendingError::InvalidAmount { amount });
        }
        let escrow = Escrow::new(loan_id, lender_id, borrower_id, amount, time.now());
        self.store.put(
            collections::ESCROWS,
            &escrow.id.to_string(),
            to_document(&escrow)?,
        )?;
        info!(
            escrow_id = %escrow.id,
            loan_id = %loan_id,
            amount = %amount,
            "escrow opened"
        );
        Ok(escrow)
    }

    /// load one escrow
    pub fn get(&self, escrow_id: EscrowId) -> Result<Escrow> {
        let doc = self
            .store
            .get(collections::ESCROWS, &escrow_id.to_string())?
            .ok_or(LendingError::NotFound {
                entity: "escrow",
                id: escrow_id.to_string(),
            })?;
        from_document(doc)
    }

    /// apply one transition. a refund credits the lender and a release
    /// credits the borrower before the new status is recorded, so a failed
    /// credit leaves the escrow in its prior status
    pub fn transition(
        &self,
        escrow_id: EscrowId,
        next: EscrowStatus,
        time: &SafeTimeProvider,
    ) -> Result<Escrow> {
        let mut escrow = self.get(escrow_id)?;
        if !escrow.can_transition_to(next) {
            return Err(LendingError::InvalidState {
                current: escrow.status.as_str().to_string(),
                expected: expected_for(next).to_string(),
            });
        }

        match next {
            EscrowStatus::Refunded => {
                self.wallets
                    .credit(escrow.lender_id, escrow.amount, "escrow refund", time)?;
            }
            EscrowStatus::Released => {
                self.wallets
                    .credit(escrow.borrower_id, escrow.amount, "escrow release", time)?;
            }
            _ => {}
        }

        escrow.status = next;
        if next.is_terminal() {
            escrow.resolved_at = Some(time.now());
        }
        self.store.put(
            collections::ESCROWS,
            &escrow.id.to_string(),
            to_document(&escrow)?,
        )?;
        info!(
            escrow_id = %escrow.id,
            loan_id = %escrow.loan_id,
            status = next.as_str(),
            "escrow transitioned"
        );
        Ok(escrow)
    }
}

fn expected_for(next: EscrowStatus) -> &'static str {
    match next {
        EscrowStatus::Approved => "pending",
        EscrowStatus::Released | EscrowStatus::Refunded => "pending or approved",
        EscrowStatus::Pending => "unreachable",
    }
}
