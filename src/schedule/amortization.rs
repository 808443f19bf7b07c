use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::{InstallmentStatus, LoanId, ScheduleId, UserId};

/// one repayment installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub due_date: DateTime<Utc>,
    /// full monthly payment
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    /// balance left after this installment
    pub remaining_balance: Money,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Installment {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }
}

/// amortized repayment schedule for one funded loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentSchedule {
    pub id: ScheduleId,
    pub loan_id: LoanId,
    pub borrower_id: UserId,
    pub lender_id: UserId,
    /// funded principal
    pub total_amount: Money,
    pub installments: Vec<Installment>,
    pub created_at: DateTime<Utc>,
}

impl RepaymentSchedule {
    /// generate the equal-installment schedule for a funded loan.
    /// every monetary value is rounded to cents as it is produced, so the
    /// principal portions may drift from the funded amount by up to one
    /// cent per installment
    pub fn generate(
        loan_id: LoanId,
        borrower_id: UserId,
        lender_id: UserId,
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        start_date: DateTime<Utc>,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LendingError::InvalidPrincipal { amount: principal });
        }
        if term_months < 1 {
            return Err(LendingError::InvalidTerm {
                months: term_months,
            });
        }
        if annual_rate.is_negative() {
            return Err(LendingError::InvalidRate { rate: annual_rate });
        }

        let monthly_rate = annual_rate.monthly_rate().as_decimal();
        let emi = calculate_emi_amount(principal, monthly_rate, term_months);

        let mut installments = Vec::with_capacity(term_months as usize);
        let mut balance = principal;

        for number in 1..=term_months {
            let due_date = add_calendar_months(start_date, number)?;
            let interest = Money::from_decimal(balance.as_decimal() * monthly_rate);
            let principal_portion = emi - interest;
            let remaining_balance = (balance - principal_portion).max(Money::ZERO);

            installments.push(Installment {
                number,
                due_date,
                amount: emi,
                principal: principal_portion,
                interest,
                remaining_balance,
                status: InstallmentStatus::Pending,
                paid_at: None,
            });

            balance = remaining_balance;
        }

        Ok(Self {
            id: Uuid::new_v4(),
            loan_id,
            borrower_id,
            lender_id,
            total_amount: principal,
            installments,
            created_at: start_date,
        })
    }

    /// get one installment by its 1-based number
    pub fn installment(&self, number: u32) -> Option<&Installment> {
        self.installments.iter().find(|i| i.number == number)
    }

    pub fn installment_mut(&mut self, number: u32) -> Option<&mut Installment> {
        self.installments.iter_mut().find(|i| i.number == number)
    }

    /// completeness is derived from the rows, never stored
    pub fn is_complete(&self) -> bool {
        self.installments.iter().all(|i| i.is_paid())
    }

    /// sum of every installment amount
    pub fn total_return(&self) -> Money {
        self.installments
            .iter()
            .map(|i| i.amount)
            .fold(Money::ZERO, |acc, x| acc + x)
    }

    /// lender earnings over the funded principal
    pub fn interest_earned(&self) -> Money {
        self.total_return() - self.total_amount
    }
}

/// EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
fn calculate_emi_amount(principal: Money, monthly_rate: Decimal, months: u32) -> Money {
    if monthly_rate.is_zero() {
        return principal / Decimal::from(months);
    }

    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + monthly_rate;
    for _ in 0..months {
        compound *= base;
    }

    let numerator = principal.as_decimal() * monthly_rate * compound;
    let denominator = compound - Decimal::ONE;
    Money::from_decimal(numerator / denominator)
}

/// due dates advance whole calendar months from the start date, clamping
/// the day when the target month is shorter
fn add_calendar_months(date: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LendingError::InvalidDate {
            message: format!("cannot add {months} months to {date}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn money(s: &str) -> Money {
        Money::from_str_exact(s).unwrap()
    }

    fn generate(
        principal: Money,
        rate_percent: u32,
        term: u32,
        start: DateTime<Utc>,
    ) -> RepaymentSchedule {
        RepaymentSchedule::generate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            principal,
            Rate::from_percentage(rate_percent),
            term,
            start,
        )
        .unwrap()
    }

    #[test]
    fn test_six_month_schedule_row_by_row() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let schedule = generate(Money::from_major(100_000), 12, 6, start);

        assert_eq!(schedule.installments.len(), 6);

        let expected = [
            // (interest, principal, remaining)
            ("1000.00", "16254.84", "83745.16"),
            ("837.45", "16417.39", "67327.77"),
            ("673.28", "16581.56", "50746.21"),
            ("507.46", "16747.38", "33998.83"),
            ("339.99", "16914.85", "17083.98"),
            ("170.84", "17084.00", "0.00"),
        ];

        for (row, (interest, principal, remaining)) in
            schedule.installments.iter().zip(expected)
        {
            assert_eq!(row.amount, money("17254.84"));
            assert_eq!(row.interest, money(interest));
            assert_eq!(row.principal, money(principal));
            assert_eq!(row.remaining_balance, money(remaining));
            assert_eq!(row.status, InstallmentStatus::Pending);
            assert_eq!(row.paid_at, None);
        }

        assert_eq!(schedule.total_return(), money("103529.04"));
        assert_eq!(schedule.interest_earned(), money("3529.04"));

        // per-step rounding drifts at most one cent per installment
        let principal_sum = schedule
            .installments
            .iter()
            .map(|i| i.principal)
            .fold(Money::ZERO, |acc, x| acc + x);
        assert!((principal_sum - schedule.total_amount).abs() <= money("0.06"));
    }

    #[test]
    fn test_zero_rate_splits_principal_evenly() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let schedule = generate(Money::from_major(5_000), 0, 5, start);

        for row in &schedule.installments {
            assert_eq!(row.amount, money("1000.00"));
            assert_eq!(row.principal, money("1000.00"));
            assert_eq!(row.interest, Money::ZERO);
        }
        assert_eq!(
            schedule.installments.last().unwrap().remaining_balance,
            Money::ZERO
        );
        assert_eq!(schedule.total_return(), money("5000.00"));
        assert_eq!(schedule.interest_earned(), Money::ZERO);
    }

    #[test]
    fn test_rounding_residual_stays_on_last_row() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let schedule = generate(Money::from_major(100_000), 12, 3, start);

        assert_eq!(schedule.installments[0].amount, money("34002.21"));

        // no final-row adjustment: the honest residual survives
        let last = schedule.installments.last().unwrap();
        assert_eq!(last.remaining_balance, money("0.01"));
    }

    #[test]
    fn test_twelve_month_emi() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let schedule = generate(Money::from_major(10_000), 10, 12, start);

        assert_eq!(schedule.installments.len(), 12);
        for row in &schedule.installments {
            assert_eq!(row.amount, money("879.16"));
        }

        let principal_sum = schedule
            .installments
            .iter()
            .map(|i| i.principal)
            .fold(Money::ZERO, |acc, x| acc + x);
        assert!((principal_sum - schedule.total_amount).abs() <= money("0.12"));
    }

    #[test]
    fn test_due_dates_are_calendar_months_apart() {
        // month-end start exercises day clamping
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 10, 30, 0).unwrap();
        let schedule = generate(Money::from_major(3_000), 12, 4, start);

        let due_dates: Vec<_> = schedule
            .installments
            .iter()
            .map(|i| i.due_date)
            .collect();
        assert_eq!(
            due_dates,
            vec![
                Utc.with_ymd_and_hms(2024, 2, 29, 10, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 31, 10, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 4, 30, 10, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 31, 10, 30, 0).unwrap(),
            ]
        );

        for pair in due_dates.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_validation_fails_fast() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let loan = Uuid::new_v4();
        let borrower = Uuid::new_v4();
        let lender = Uuid::new_v4();

        let zero_principal = RepaymentSchedule::generate(
            loan,
            borrower,
            lender,
            Money::ZERO,
            Rate::from_percentage(12),
            6,
            start,
        );
        assert!(matches!(
            zero_principal,
            Err(LendingError::InvalidPrincipal { .. })
        ));

        let zero_term = RepaymentSchedule::generate(
            loan,
            borrower,
            lender,
            Money::from_major(1_000),
            Rate::from_percentage(12),
            0,
            start,
        );
        assert!(matches!(zero_term, Err(LendingError::InvalidTerm { .. })));

        let negative_rate = RepaymentSchedule::generate(
            loan,
            borrower,
            lender,
            Money::from_major(1_000),
            Rate::from_decimal(Decimal::new(-5, 2)),
            6,
            start,
        );
        assert!(matches!(
            negative_rate,
            Err(LendingError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_lookup_by_number() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let mut schedule = generate(Money::from_major(5_000), 12, 6, start);

        assert_eq!(schedule.installment(1).unwrap().number, 1);
        assert_eq!(schedule.installment(6).unwrap().number, 6);
        assert!(schedule.installment(0).is_none());
        assert!(schedule.installment(7).is_none());

        schedule.installment_mut(3).unwrap().status = InstallmentStatus::Paid;
        assert!(schedule.installment(3).unwrap().is_paid());
        assert!(!schedule.is_complete());
    }
}
