use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::{EscrowId, LoanId, LoanStatus, ScheduleId, UserId};

/// one peer-to-peer loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub borrower_id: UserId,
    pub lender_id: Option<UserId>,

    // request terms
    pub amount: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub purpose: String,

    // funding, set when a lender commits
    pub funded_amount: Option<Money>,
    pub funded_at: Option<DateTime<Utc>>,
    pub escrow_id: Option<EscrowId>,
    pub repayment_schedule_id: Option<ScheduleId>,

    // lifecycle
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// create a new pending loan request
    pub fn new(
        borrower_id: UserId,
        amount: Money,
        interest_rate: Rate,
        term_months: u32,
        purpose: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            borrower_id,
            lender_id: None,
            amount,
            interest_rate,
            term_months,
            purpose,
            funded_amount: None,
            funded_at: None,
            escrow_id: None,
            repayment_schedule_id: None,
            status: LoanStatus::Pending,
            created_at,
            completed_at: None,
        }
    }

    /// check if the loan is waiting for a lender
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Pending
    }

    /// attach funding details, pending -> funding
    pub fn begin_funding(
        &mut self,
        lender_id: UserId,
        funded_amount: Money,
        escrow_id: EscrowId,
        schedule_id: ScheduleId,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.guard(LoanStatus::Pending)?;
        self.lender_id = Some(lender_id);
        self.funded_amount = Some(funded_amount);
        self.funded_at = Some(timestamp);
        self.escrow_id = Some(escrow_id);
        self.repayment_schedule_id = Some(schedule_id);
        self.status = LoanStatus::Funding;
        Ok(())
    }

    /// escrow released to the borrower, funding -> repaying
    pub fn begin_repaying(&mut self) -> Result<()> {
        self.guard(LoanStatus::Funding)?;
        self.status = LoanStatus::Repaying;
        Ok(())
    }

    /// every installment settled, repaying -> completed
    pub fn complete(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        self.guard(LoanStatus::Repaying)?;
        self.status = LoanStatus::Completed;
        self.completed_at = Some(timestamp);
        Ok(())
    }

    /// escrow refunded, funding -> pending with funding fields cleared
    pub fn revert_to_pending(&mut self) -> Result<()> {
        self.guard(LoanStatus::Funding)?;
        self.lender_id = None;
        self.funded_amount = None;
        self.funded_at = None;
        self.escrow_id = None;
        self.repayment_schedule_id = None;
        self.status = LoanStatus::Pending;
        Ok(())
    }

    fn guard(&self, expected: LoanStatus) -> Result<()> {
        if self.status != expected {
            return Err(LendingError::InvalidState {
                current: self.status.as_str().to_string(),
                expected: expected.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// load one loan from the store
pub fn load_loan(store: &dyn DocumentStore, loan_id: LoanId) -> Result<Loan> {
    let document = store
        .get(collections::LOANS, &loan_id.to_string())?
        .ok_or_else(|| LendingError::NotFound {
            entity: "loan",
            id: loan_id.to_string(),
        })?;
    from_document(document)
}

/// persist one loan keyed by its id
pub fn save_loan(store: &dyn DocumentStore, loan: &Loan) -> Result<()> {
    store.put(collections::LOANS, &loan.id.to_string(), to_document(loan)?)
}
