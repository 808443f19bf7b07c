use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a user (borrower, lender, or admin)
pub type UserId = Uuid;

/// unique identifier for an escrow record
pub type EscrowId = Uuid;

/// unique identifier for a repayment schedule
pub type ScheduleId = Uuid;

/// unique identifier for a transaction record
pub type TransactionId = Uuid;

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// request created, waiting for a lender
    Pending,
    /// lender committed, funds held in escrow
    Funding,
    /// escrow released to borrower, installments being paid
    Repaying,
    /// every installment paid
    Completed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Funding => "funding",
            LoanStatus::Repaying => "repaying",
            LoanStatus::Completed => "completed",
        }
    }
}

/// escrow lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// funds held, waiting for admin review
    Pending,
    /// admin approved, funds still held
    Approved,
    /// funds disbursed to the borrower
    Released,
    /// funds returned to the lender
    Refunded,
}

impl EscrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowStatus::Pending => "pending",
            EscrowStatus::Approved => "approved",
            EscrowStatus::Released => "released",
            EscrowStatus::Refunded => "refunded",
        }
    }

    /// released and refunded escrows accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, EscrowStatus::Released | EscrowStatus::Refunded)
    }
}

/// raw installment status, persisted with the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    /// not yet settled
    Pending,
    /// settled, paid_at recorded
    Paid,
}

/// display status derived on read, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentStatus {
    /// raw status is paid
    Paid,
    /// due date has passed
    Overdue,
    /// due within the configured window
    DueSoon,
    /// due later
    Pending,
}

impl RepaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepaymentStatus::Paid => "paid",
            RepaymentStatus::Overdue => "overdue",
            RepaymentStatus::DueSoon => "due_soon",
            RepaymentStatus::Pending => "pending",
        }
    }
}

/// transaction record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// lender wallet debited into escrow
    Funding,
    /// escrow released to the borrower
    Disbursement,
    /// escrow returned to the lender
    Refund,
    /// installment settled by the borrower
    Repayment,
}
