use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::Result;
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::{LoanId, TransactionId, TransactionKind, UserId};

/// advisory audit entry for one money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub counterparty_id: Option<UserId>,
    pub amount: Money,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

/// transaction history writer and reader
#[derive(Clone)]
pub struct TransactionHistory {
    store: Arc<dyn DocumentStore>,
}

impl TransactionHistory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// persist one audit entry
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        kind: TransactionKind,
        loan_id: LoanId,
        user_id: UserId,
        counterparty_id: Option<UserId>,
        amount: Money,
        reference: &str,
        time: &SafeTimeProvider,
    ) -> Result<TransactionRecord> {
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            kind,
            loan_id,
            user_id,
            counterparty_id,
            amount,
            reference: reference.to_string(),
            created_at: time.now(),
        };
        self.store.put(
            collections::TRANSACTIONS,
            &record.id.to_string(),
            to_document(&record)?,
        )?;
        Ok(record)
    }

    /// entries for one loan, oldest first
    pub fn for_loan(&self, loan_id: LoanId) -> Result<Vec<TransactionRecord>> {
        let docs = self.store.find_eq(
            collections::TRANSACTIONS,
            "loan_id",
            &to_document(&loan_id)?,
        )?;
        collect_sorted(docs)
    }

    /// entries for one user, oldest first
    pub fn for_user(&self, user_id: UserId) -> Result<Vec<TransactionRecord>> {
        let docs = self.store.find_eq(
            collections::TRANSACTIONS,
            "user_id",
            &to_document(&user_id)?,
        )?;
        collect_sorted(docs)
    }
}

fn collect_sorted(docs: Vec<serde_json::Value>) -> Result<Vec<TransactionRecord>> {
    let mut records = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<TransactionRecord>>>()?;
    records.sort_by_key(|r| r.created_at);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    #[test]
    fn test_record_and_query_by_loan_and_user() {
        let store = Arc::new(MemoryStore::new());
        let history = TransactionHistory::new(store);
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));

        let loan = Uuid::new_v4();
        let lender = Uuid::new_v4();
        let borrower = Uuid::new_v4();

        history
            .record(
                TransactionKind::Funding,
                loan,
                lender,
                Some(borrower),
                Money::from_major(1_000),
                "loan funded",
                &time,
            )
            .unwrap();
        time.test_control().unwrap().advance(chrono::Duration::days(1));
        history
            .record(
                TransactionKind::Disbursement,
                loan,
                borrower,
                Some(lender),
                Money::from_major(1_000),
                "escrow released",
                &time,
            )
            .unwrap();

        let for_loan = history.for_loan(loan).unwrap();
        assert_eq!(for_loan.len(), 2);
        assert_eq!(for_loan[0].kind, TransactionKind::Funding);
        assert_eq!(for_loan[1].kind, TransactionKind::Disbursement);

        let for_lender = history.for_user(lender).unwrap();
        assert_eq!(for_lender.len(), 1);
        assert_eq!(for_lender[0].kind, TransactionKind::Funding);

        assert!(history.for_loan(Uuid::new_v4()).unwrap().is_empty());
    }
}
