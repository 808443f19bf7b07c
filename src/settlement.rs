use std::sync::Arc;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde_json::json;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::history::TransactionHistory;
use crate::loan::{load_loan, save_loan};
use crate::milestones::MilestoneTracker;
use crate::notify::{Notification, NotificationKind, Notifier};
use crate::schedule::{days_until_due, RepaymentSchedule};
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::{InstallmentStatus, LoanStatus, ScheduleId, TransactionKind, UserId};

/// what settling one installment produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub loan_completed: bool,
    pub paid_at: DateTime<Utc>,
    pub days_late: i64,
}

/// settles installments and drives loans to completion
pub struct SettlementService {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    history: TransactionHistory,
    milestones: MilestoneTracker,
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let history = TransactionHistory::new(Arc::clone(&store));
        let milestones =
            MilestoneTracker::new(Arc::clone(&store), config.milestones.thresholds.clone());
        Self {
            store,
            notifier,
            history,
            milestones,
        }
    }

    /// load one repayment schedule
    pub fn schedule(&self, schedule_id: ScheduleId) -> Result<RepaymentSchedule> {
        let doc = self
            .store
            .get(collections::SCHEDULES, &schedule_id.to_string())?
            .ok_or_else(|| LendingError::NotFound {
                entity: "schedule",
                id: schedule_id.to_string(),
            })?;
        from_document(doc)
    }

    pub fn milestones(&self) -> &MilestoneTracker {
        &self.milestones
    }

    /// record a borrower payment against one installment.
    ///
    /// settlement only runs while the loan is repaying, so an unresolved
    /// escrow keeps its refund path until the money has actually moved.
    /// the flip happens inside a single document update, so a repeated call
    /// settles nothing twice. completion is derived from the rows alone:
    /// when the last installment flips, the loan is completed and the
    /// lender's portfolio milestones are rechecked.
    pub fn mark_paid(
        &self,
        schedule_id: ScheduleId,
        installment_number: u32,
        time: &SafeTimeProvider,
    ) -> Result<SettlementOutcome> {
        let now = time.now();
        let current = self.schedule(schedule_id)?;
        let loan = load_loan(self.store.as_ref(), current.loan_id)?;
        if loan.status != LoanStatus::Repaying {
            return Err(LendingError::InvalidState {
                current: loan.status.as_str().to_string(),
                expected: LoanStatus::Repaying.as_str().to_string(),
            });
        }

        let updated = match self.store.update(
            collections::SCHEDULES,
            &schedule_id.to_string(),
            &mut |doc| {
                let doc = doc.ok_or_else(|| LendingError::NotFound {
                    entity: "schedule",
                    id: schedule_id.to_string(),
                })?;
                let mut schedule: RepaymentSchedule = from_document(doc)?;
                let installment = schedule
                    .installment_mut(installment_number)
                    .ok_or_else(|| LendingError::NotFound {
                        entity: "installment",
                        id: installment_number.to_string(),
                    })?;
                if installment.status == InstallmentStatus::Paid {
                    return Err(LendingError::AlreadyPaid {
                        number: installment_number,
                    });
                }
                installment.status = InstallmentStatus::Paid;
                installment.paid_at = Some(now);
                to_document(&schedule)
            },
        ) {
            Ok(updated) => updated,
            Err(LendingError::AlreadyPaid { number }) => {
                // a fully paid schedule whose completion write failed
                // earlier gets another chance on the replay
                if current.is_complete() {
                    self.complete_loan(&current, time)?;
                }
                return Err(LendingError::AlreadyPaid { number });
            }
            Err(err) => return Err(err),
        };

        let schedule: RepaymentSchedule = from_document(updated)?;
        let installment = schedule
            .installment(installment_number)
            .ok_or_else(|| LendingError::NotFound {
                entity: "installment",
                id: installment_number.to_string(),
            })?;
        let days_late = (-days_until_due(installment.due_date, now)).max(0);
        let amount = installment.amount;

        info!(
            schedule_id = %schedule_id,
            loan_id = %schedule.loan_id,
            installment = installment_number,
            days_late,
            "installment settled"
        );

        let body = if days_late > 0 {
            format!(
                "installment {} on loan {} paid {} days late",
                installment_number, schedule.loan_id, days_late
            )
        } else {
            format!(
                "installment {} on loan {} paid on time",
                installment_number, schedule.loan_id
            )
        };
        self.advise(
            Notification::new(
                schedule.lender_id,
                NotificationKind::PaymentReceived,
                "payment received",
                body,
            )
            .with_context(json!({
                "loan_id": schedule.loan_id,
                "schedule_id": schedule.id,
                "installment": installment_number,
                "days_late": days_late,
            })),
        );
        self.record_repayment(&schedule, installment_number, amount, time);

        let loan_completed = schedule.is_complete();
        if loan_completed {
            self.complete_loan(&schedule, time)?;
        }

        Ok(SettlementOutcome {
            loan_completed,
            paid_at: now,
            days_late,
        })
    }

    /// final installment settled, move the loan to completed
    fn complete_loan(&self, schedule: &RepaymentSchedule, time: &SafeTimeProvider) -> Result<()> {
        let mut loan = load_loan(self.store.as_ref(), schedule.loan_id)?;
        loan.complete(time.now())?;
        save_loan(self.store.as_ref(), &loan)?;

        let total_return = schedule.total_return();
        let interest_earned = schedule.interest_earned();
        info!(
            loan_id = %loan.id,
            total_return = %total_return,
            interest_earned = %interest_earned,
            "loan completed"
        );
        self.advise(
            Notification::new(
                schedule.lender_id,
                NotificationKind::LoanCompleted,
                "loan completed",
                format!(
                    "loan {} fully repaid, {} returned with {} interest",
                    loan.id, total_return, interest_earned
                ),
            )
            .with_context(json!({
                "loan_id": loan.id,
                "total_return": total_return,
                "interest_earned": interest_earned,
            })),
        );

        self.check_milestones(schedule.lender_id, time);
        Ok(())
    }

    /// advisory: newly crossed portfolio milestones, each notified once
    fn check_milestones(&self, lender_id: UserId, time: &SafeTimeProvider) {
        let crossed = match self.milestones.crossed_thresholds(lender_id, time) {
            Ok(crossed) => crossed,
            Err(err) => {
                warn!(lender_id = %lender_id, error = %err, "milestone check failed");
                return;
            }
        };
        for threshold in crossed {
            self.advise(
                Notification::new(
                    lender_id,
                    NotificationKind::RoiMilestone,
                    "return milestone reached",
                    format!("your portfolio return crossed {} percent", threshold),
                )
                .with_context(json!({ "roi_percent": threshold })),
            );
        }
    }

    fn record_repayment(
        &self,
        schedule: &RepaymentSchedule,
        installment_number: u32,
        amount: Money,
        time: &SafeTimeProvider,
    ) {
        if let Err(err) = self.history.record(
            TransactionKind::Repayment,
            schedule.loan_id,
            schedule.borrower_id,
            Some(schedule.lender_id),
            amount,
            &format!("installment {}", installment_number),
            time,
        ) {
            warn!(
                loan_id = %schedule.loan_id,
                error = %err,
                "transaction record failed"
            );
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
