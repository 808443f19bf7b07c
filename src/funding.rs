use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use serde_json::json;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::escrow::{Escrow, EscrowLedger};
use crate::history::TransactionHistory;
use crate::loan::{load_loan, save_loan, Loan};
use crate::notify::{AdminDirectory, Notification, NotificationKind, NotificationPriority, Notifier};
use crate::schedule::RepaymentSchedule;
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::{EscrowId, EscrowStatus, LoanId, LoanStatus, ScheduleId, TransactionKind, UserId};
use crate::wallet::WalletLedger;

/// what a successful funding produced
#[derive(Debug, Clone, PartialEq)]
pub struct FundingOutcome {
    pub loan_id: LoanId,
    pub escrow_id: EscrowId,
    pub schedule_id: ScheduleId,
    pub funded_amount: Money,
    /// lender balance after the debit
    pub wallet_balance: Money,
}

/// runs loan intake, the funding sequence, and escrow resolution.
///
/// the funding sequence moves real balances, so each step that follows the
/// wallet debit carries an explicit compensation: failures put the lender's
/// money back and leave the loan on the book. notification and history
/// writes are advisory and never fail a workflow.
pub struct FundingOrchestrator {
    store: Arc<dyn DocumentStore>,
    wallets: WalletLedger,
    escrows: EscrowLedger,
    history: TransactionHistory,
    notifier: Arc<dyn Notifier>,
    admins: Arc<dyn AdminDirectory>,
    config: EngineConfig,
}

impl FundingOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        admins: Arc<dyn AdminDirectory>,
        config: EngineConfig,
    ) -> Self {
        let wallets = WalletLedger::new(Arc::clone(&store));
        let escrows = EscrowLedger::new(Arc::clone(&store));
        let history = TransactionHistory::new(Arc::clone(&store));
        Self {
            store,
            wallets,
            escrows,
            history,
            notifier,
            admins,
            config,
        }
    }

    /// create a pending loan request for a borrower
    pub fn submit_request(
        &self,
        borrower_id: UserId,
        amount: Money,
        annual_rate: Rate,
        term_months: u32,
        purpose: &str,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        if !amount.is_positive() {
            return Err(LendingError::InvalidPrincipal { amount });
        }
        if let Some(cap) = self.config.funding.maximum_principal {
            if amount > cap {
                return Err(LendingError::InvalidPrincipal { amount });
            }
        }
        if term_months < 1 {
            return Err(LendingError::InvalidTerm {
                months: term_months,
            });
        }
        if let Some(cap) = self.config.funding.maximum_term_months {
            if term_months > cap {
                return Err(LendingError::InvalidTerm {
                    months: term_months,
                });
            }
        }
        if annual_rate.is_negative() {
            return Err(LendingError::InvalidRate { rate: annual_rate });
        }

        let loan = Loan::new(
            borrower_id,
            amount,
            annual_rate,
            term_months,
            purpose.to_string(),
            time.now(),
        );
        save_loan(self.store.as_ref(), &loan)?;
        info!(
            loan_id = %loan.id,
            borrower_id = %borrower_id,
            amount = %amount,
            term_months,
            "loan request submitted"
        );
        Ok(loan)
    }

    /// load one loan
    pub fn get_loan(&self, loan_id: LoanId) -> Result<Loan> {
        load_loan(self.store.as_ref(), loan_id)
    }

    /// loans still waiting for a lender, oldest first
    pub fn open_requests(&self) -> Result<Vec<Loan>> {
        let docs = self.store.find_eq(
            collections::LOANS,
            "status",
            &to_document(&LoanStatus::Pending)?,
        )?;
        let mut loans: Vec<Loan> = Vec::with_capacity(docs.len());
        for doc in docs {
            loans.push(from_document(doc)?);
        }
        loans.sort_by_key(|loan| loan.created_at);
        Ok(loans)
    }

    /// fund a pending loan.
    ///
    /// sequence: validate, debit the lender, open escrow, tell the admins,
    /// build and persist the repayment schedule, move the loan to funding.
    /// the wallet debit is the point of no return for compensation: an
    /// escrow failure re-credits the wallet directly, later failures refund
    /// through the escrow so the money is never in two places.
    pub fn fund_loan(
        &self,
        loan_id: LoanId,
        lender_id: UserId,
        borrower_id: UserId,
        amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<FundingOutcome> {
        let mut loan = load_loan(self.store.as_ref(), loan_id)?;
        self.check_fundable(&loan, borrower_id, amount)?;

        let wallet_balance = self.wallets.debit(lender_id, amount, "loan funding", time)?;

        let escrow = match self.escrows.open(loan_id, lender_id, borrower_id, amount, time) {
            Ok(escrow) => escrow,
            Err(err) => {
                self.rollback_debit(lender_id, amount, time);
                return Err(err);
            }
        };

        self.broadcast_escrow_pending(&loan, &escrow);

        let schedule = match self.build_schedule(&loan, lender_id, amount, time) {
            Ok(schedule) => schedule,
            Err(err) => {
                self.rollback_escrow(escrow.id, None, time);
                return Err(err);
            }
        };

        if let Err(err) = loan.begin_funding(lender_id, amount, escrow.id, schedule.id, time.now())
        {
            self.rollback_escrow(escrow.id, Some(schedule.id), time);
            return Err(err);
        }
        if let Err(err) = save_loan(self.store.as_ref(), &loan) {
            self.rollback_escrow(escrow.id, Some(schedule.id), time);
            return Err(err);
        }

        self.record_advisory(
            TransactionKind::Funding,
            loan.id,
            lender_id,
            Some(borrower_id),
            amount,
            "lender funds placed in escrow",
            time,
        );
        self.advise(
            Notification::new(
                lender_id,
                NotificationKind::FundingConfirmed,
                "funding confirmed",
                format!("your {} is held in escrow for loan {}", amount, loan.id),
            )
            .with_context(json!({ "loan_id": loan.id, "escrow_id": escrow.id })),
        );

        info!(
            loan_id = %loan.id,
            lender_id = %lender_id,
            escrow_id = %escrow.id,
            schedule_id = %schedule.id,
            amount = %amount,
            "loan funded"
        );

        Ok(FundingOutcome {
            loan_id: loan.id,
            escrow_id: escrow.id,
            schedule_id: schedule.id,
            funded_amount: amount,
            wallet_balance,
        })
    }

    /// admin sign-off, escrow pending -> approved
    pub fn approve_escrow(&self, escrow_id: EscrowId, time: &SafeTimeProvider) -> Result<Escrow> {
        let escrow = self
            .escrows
            .transition(escrow_id, EscrowStatus::Approved, time)?;
        self.advise(
            Notification::new(
                escrow.lender_id,
                NotificationKind::EscrowApproved,
                "escrow approved",
                format!("escrow for loan {} cleared review", escrow.loan_id),
            )
            .with_context(json!({ "loan_id": escrow.loan_id, "escrow_id": escrow.id })),
        );
        Ok(escrow)
    }

    /// disburse to the borrower, escrow -> released and loan -> repaying
    pub fn release_escrow(&self, escrow_id: EscrowId, time: &SafeTimeProvider) -> Result<Escrow> {
        let held = self.escrows.get(escrow_id)?;
        let mut loan = self.loan_in_funding(&held)?;

        let escrow = self
            .escrows
            .transition(escrow_id, EscrowStatus::Released, time)?;
        loan.begin_repaying()?;
        save_loan(self.store.as_ref(), &loan)?;

        self.record_advisory(
            TransactionKind::Disbursement,
            loan.id,
            escrow.borrower_id,
            Some(escrow.lender_id),
            escrow.amount,
            "escrow released to borrower",
            time,
        );
        self.advise(
            Notification::new(
                escrow.borrower_id,
                NotificationKind::FundsDisbursed,
                "funds disbursed",
                format!("{} for loan {} is in your wallet", escrow.amount, loan.id),
            )
            .with_context(json!({ "loan_id": loan.id, "escrow_id": escrow.id })),
        );

        info!(
            loan_id = %loan.id,
            escrow_id = %escrow.id,
            amount = %escrow.amount,
            "escrow released"
        );
        Ok(escrow)
    }

    /// cancel a funding, escrow -> refunded and the loan back on the book
    pub fn refund_escrow(&self, escrow_id: EscrowId, time: &SafeTimeProvider) -> Result<Escrow> {
        let held = self.escrows.get(escrow_id)?;
        let mut loan = self.loan_in_funding(&held)?;
        let schedule_id = loan.repayment_schedule_id;

        let escrow = self
            .escrows
            .transition(escrow_id, EscrowStatus::Refunded, time)?;
        loan.revert_to_pending()?;
        save_loan(self.store.as_ref(), &loan)?;

        // settlements against a refunded loan must come back not found
        if let Some(schedule_id) = schedule_id {
            if let Err(err) = self
                .store
                .delete(collections::SCHEDULES, &schedule_id.to_string())
            {
                warn!(
                    schedule_id = %schedule_id,
                    error = %err,
                    "schedule delete failed"
                );
            }
        }

        self.record_advisory(
            TransactionKind::Refund,
            loan.id,
            escrow.lender_id,
            Some(escrow.borrower_id),
            escrow.amount,
            "escrow refunded to lender",
            time,
        );
        self.advise(
            Notification::new(
                escrow.lender_id,
                NotificationKind::EscrowRefunded,
                "escrow refunded",
                format!(
                    "{} for loan {} returned to your wallet",
                    escrow.amount, loan.id
                ),
            )
            .with_context(json!({ "loan_id": loan.id, "escrow_id": escrow.id })),
        );

        info!(
            loan_id = %loan.id,
            escrow_id = %escrow.id,
            amount = %escrow.amount,
            "escrow refunded"
        );
        Ok(escrow)
    }

    pub fn wallets(&self) -> &WalletLedger {
        &self.wallets
    }

    pub fn escrows(&self) -> &EscrowLedger {
        &self.escrows
    }

    pub fn history(&self) -> &TransactionHistory {
        &self.history
    }

    fn check_fundable(&self, loan: &Loan, borrower_id: UserId, amount: Money) -> Result<()> {
        if !loan.is_open() {
            return Err(LendingError::InvalidState {
                current: loan.status.as_str().to_string(),
                expected: LoanStatus::Pending.as_str().to_string(),
            });
        }
        if loan.borrower_id != borrower_id {
            return Err(LendingError::BorrowerMismatch {
                expected: loan.borrower_id,
                provided: borrower_id,
            });
        }
        if !amount.is_positive() {
            return Err(LendingError::InvalidAmount { amount });
        }
        if amount > loan.amount {
            return Err(LendingError::AmountExceedsRequest {
                requested: loan.amount,
                provided: amount,
            });
        }
        let minimum = self.config.funding.minimum_funding;
        if minimum.is_positive() && amount < minimum {
            return Err(LendingError::BelowMinimumFunding {
                minimum,
                provided: amount,
            });
        }
        Ok(())
    }

    /// resolution needs a live escrow whose loan is still in funding
    fn loan_in_funding(&self, escrow: &Escrow) -> Result<Loan> {
        if escrow.status.is_terminal() {
            return Err(LendingError::InvalidState {
                current: escrow.status.as_str().to_string(),
                expected: "pending or approved".to_string(),
            });
        }
        let loan = load_loan(self.store.as_ref(), escrow.loan_id)?;
        if loan.status != LoanStatus::Funding {
            return Err(LendingError::InvalidState {
                current: loan.status.as_str().to_string(),
                expected: LoanStatus::Funding.as_str().to_string(),
            });
        }
        Ok(loan)
    }

    fn build_schedule(
        &self,
        loan: &Loan,
        lender_id: UserId,
        funded_amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<RepaymentSchedule> {
        let schedule = RepaymentSchedule::generate(
            loan.id,
            loan.borrower_id,
            lender_id,
            funded_amount,
            loan.interest_rate,
            loan.term_months,
            time.now(),
        )?;
        self.store.put(
            collections::SCHEDULES,
            &schedule.id.to_string(),
            to_document(&schedule)?,
        )?;
        Ok(schedule)
    }

    /// put debited funds back after a failure before escrow existed
    fn rollback_debit(&self, lender_id: UserId, amount: Money, time: &SafeTimeProvider) {
        if let Err(err) = self
            .wallets
            .credit(lender_id, amount, "funding rollback", time)
        {
            warn!(
                lender_id = %lender_id,
                amount = %amount,
                error = %err,
                "rollback credit failed"
            );
        }
    }

    /// unwind a part-built funding: drop the schedule, refund the escrow
    fn rollback_escrow(
        &self,
        escrow_id: EscrowId,
        schedule_id: Option<ScheduleId>,
        time: &SafeTimeProvider,
    ) {
        if let Some(schedule_id) = schedule_id {
            if let Err(err) = self
                .store
                .delete(collections::SCHEDULES, &schedule_id.to_string())
            {
                warn!(
                    schedule_id = %schedule_id,
                    error = %err,
                    "rollback schedule delete failed"
                );
            }
        }
        if let Err(err) = self
            .escrows
            .transition(escrow_id, EscrowStatus::Refunded, time)
        {
            warn!(
                escrow_id = %escrow_id,
                error = %err,
                "rollback refund failed"
            );
        }
    }

    fn broadcast_escrow_pending(&self, loan: &Loan, escrow: &Escrow) {
        let admin_ids = match self.admins.admin_user_ids() {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "admin directory lookup failed");
                return;
            }
        };
        for admin_id in admin_ids {
            self.advise(
                Notification::new(
                    admin_id,
                    NotificationKind::EscrowPending,
                    "escrow awaiting approval",
                    format!("loan {} holds {} in escrow", loan.id, escrow.amount),
                )
                .with_priority(NotificationPriority::High)
                .with_context(json!({ "loan_id": loan.id, "escrow_id": escrow.id })),
            );
        }
    }

    fn record_advisory(
        &self,
        kind: TransactionKind,
        loan_id: LoanId,
        user_id: UserId,
        counterparty_id: Option<UserId>,
        amount: Money,
        reference: &str,
        time: &SafeTimeProvider,
    ) {
        if let Err(err) = self
            .history
            .record(kind, loan_id, user_id, counterparty_id, amount, reference, time)
        {
            warn!(loan_id = %loan_id, error = %err, "transaction record failed");
        }
    }

    fn advise(&self, notification: Notification) {
        let user_id = notification.user_id;
        let kind = notification.kind;
        if let Err(err) = self.notifier.notify(notification) {
            warn!(
                user_id = %user_id,
                kind = kind.as_str(),
                error = %err,
                "notification delivery failed"
            );
        }
    }
}
