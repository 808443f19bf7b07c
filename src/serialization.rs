/// serializable views over loans, escrows and schedules
use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::RepaymentConfig;
use crate::decimal::{Money, Rate};
use crate::escrow::Escrow;
use crate::loan::Loan;
use crate::schedule::{days_until_due, resolve_status, RepaymentSchedule};
use crate::types::{
    EscrowId, EscrowStatus, LoanId, LoanStatus, RepaymentStatus, ScheduleId, UserId,
};

/// view of one loan
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub borrower_id: UserId,
    pub lender_id: Option<UserId>,
    pub amount: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub purpose: String,
    pub status: LoanStatus,
    pub funded_amount: Option<Money>,
    pub funded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        LoanView {
            id: loan.id,
            borrower_id: loan.borrower_id,
            lender_id: loan.lender_id,
            amount: loan.amount,
            interest_rate: loan.interest_rate,
            term_months: loan.term_months,
            purpose: loan.purpose.clone(),
            status: loan.status,
            funded_amount: loan.funded_amount,
            funded_at: loan.funded_at,
            created_at: loan.created_at,
            completed_at: loan.completed_at,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// view of one escrow hold
#[derive(Debug, Serialize, Deserialize)]
pub struct EscrowView {
    pub id: EscrowId,
    pub loan_id: LoanId,
    pub lender_id: UserId,
    pub borrower_id: UserId,
    pub amount: Money,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EscrowView {
    pub fn from_escrow(escrow: &Escrow) -> Self {
        EscrowView {
            id: escrow.id,
            loan_id: escrow.loan_id,
            lender_id: escrow.lender_id,
            borrower_id: escrow.borrower_id,
            amount: escrow.amount,
            status: escrow.status,
            created_at: escrow.created_at,
            resolved_at: escrow.resolved_at,
        }
    }
}

/// one installment with its display status resolved against the clock.
/// the stored row only ever says paid or pending; overdue and due soon
/// exist at read time
#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub number: u32,
    pub due_date: DateTime<Utc>,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    pub remaining_balance: Money,
    pub status: RepaymentStatus,
    pub days_until_due: i64,
    pub paid_at: Option<DateTime<Utc>>,
}

/// view of one repayment schedule
#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleView {
    pub id: ScheduleId,
    pub loan_id: LoanId,
    pub borrower_id: UserId,
    pub lender_id: UserId,
    pub total_amount: Money,
    pub total_return: Money,
    pub interest_earned: Money,
    pub paid_count: u32,
    pub next_due: Option<DateTime<Utc>>,
    pub installments: Vec<InstallmentView>,
}

impl ScheduleView {
    pub fn from_schedule(
        schedule: &RepaymentSchedule,
        config: &RepaymentConfig,
        time: &SafeTimeProvider,
    ) -> Self {
        let now = time.now();
        let installments: Vec<InstallmentView> = schedule
            .installments
            .iter()
            .map(|installment| InstallmentView {
                number: installment.number,
                due_date: installment.due_date,
                amount: installment.amount,
                principal: installment.principal,
                interest: installment.interest,
                remaining_balance: installment.remaining_balance,
                status: resolve_status(
                    installment.status,
                    installment.due_date,
                    now,
                    config.due_soon_window_days,
                ),
                days_until_due: days_until_due(installment.due_date, now),
                paid_at: installment.paid_at,
            })
            .collect();
        let paid_count = schedule
            .installments
            .iter()
            .filter(|installment| installment.is_paid())
            .count() as u32;
        let next_due = schedule
            .installments
            .iter()
            .find(|installment| !installment.is_paid())
            .map(|installment| installment.due_date);

        ScheduleView {
            id: schedule.id,
            loan_id: schedule.loan_id,
            borrower_id: schedule.borrower_id,
            lender_id: schedule.lender_id,
            total_amount: schedule.total_amount,
            total_return: schedule.total_return(),
            interest_earned: schedule.interest_earned(),
            paid_count,
            next_due,
            installments,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use crate::config::EngineConfig;
    use crate::decimal::Rate;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn schedule_starting_jan_15() -> RepaymentSchedule {
        RepaymentSchedule::generate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            money("400"),
            Rate::ZERO,
            4,
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn display_status_is_resolved_against_the_clock() {
        let mut schedule = schedule_starting_jan_15();
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap();
        {
            let first = schedule.installment_mut(1).unwrap();
            first.status = crate::types::InstallmentStatus::Paid;
            first.paid_at = Some(paid_at);
        }

        // due dates run feb 15 through may 15; viewed march 20
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap(),
        ));
        let config = EngineConfig::standard();
        let view = ScheduleView::from_schedule(&schedule, &config.repayment, &time);

        let statuses: Vec<RepaymentStatus> =
            view.installments.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                RepaymentStatus::Paid,
                RepaymentStatus::Overdue,
                RepaymentStatus::Pending,
                RepaymentStatus::Pending,
            ]
        );
        assert_eq!(view.paid_count, 1);
        assert_eq!(
            view.next_due,
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(view.installments[0].paid_at, Some(paid_at));
    }

    #[test]
    fn an_installment_inside_the_window_shows_due_soon() {
        let schedule = schedule_starting_jan_15();

        // april 10 is five days before the april 15 installment
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap(),
        ));
        let config = EngineConfig::standard();
        let view = ScheduleView::from_schedule(&schedule, &config.repayment, &time);

        assert_eq!(view.installments[2].status, RepaymentStatus::DueSoon);
        assert_eq!(view.installments[2].days_until_due, 5);
        assert_eq!(view.installments[3].status, RepaymentStatus::Pending);
    }

    #[test]
    fn loan_view_serializes_to_json() {
        let loan = Loan::new(
            Uuid::new_v4(),
            money("250"),
            Rate::from_percentage(10),
            4,
            "seed stock".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        let json = LoanView::from_loan(&loan).to_json_pretty().unwrap();
        assert!(json.contains("\"status\": \"Pending\""));
        assert!(json.contains("\"purpose\": \"seed stock\""));
        assert!(json.contains("\"amount\": \"250\""));
    }
}
