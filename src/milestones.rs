use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::decimal::Money;
use crate::errors::Result;
use crate::schedule::RepaymentSchedule;
use crate::store::{collections, from_document, to_document, DocumentStore};
use crate::types::UserId;

/// per-lender record of roi thresholds already reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiMilestones {
    pub lender_id: UserId,
    pub reached: Vec<u32>,
    pub updated_at: DateTime<Utc>,
}

/// portfolio roi milestone tracker
#[derive(Clone)]
pub struct MilestoneTracker {
    store: Arc<dyn DocumentStore>,
    thresholds: Vec<u32>,
}

impl MilestoneTracker {
    pub fn new(store: Arc<dyn DocumentStore>, thresholds: Vec<u32>) -> Self {
        Self { store, thresholds }
    }

    /// cumulative roi percentage over the lender's completed loans, none
    /// while nothing has completed
    pub fn portfolio_roi(&self, lender_id: UserId) -> Result<Option<Decimal>> {
        let docs = self.store.find_eq(
            collections::SCHEDULES,
            "lender_id",
            &to_document(&lender_id)?,
        )?;

        let mut total_principal = Money::ZERO;
        let mut total_interest = Money::ZERO;
        for doc in docs {
            let schedule: RepaymentSchedule = from_document(doc)?;
            // in-flight loans have no realized interest yet
            if schedule.is_complete() {
                total_principal += schedule.total_amount;
                total_interest += schedule.interest_earned();
            }
        }

        if total_principal.is_zero() {
            return Ok(None);
        }
        Ok(Some(
            total_interest.as_decimal() / total_principal.as_decimal() * dec!(100),
        ))
    }

    /// thresholds newly crossed by the current roi. each threshold is
    /// persisted into the lender's reached set in the same store update
    /// that reports it, so it fires at most once
    pub fn crossed_thresholds(
        &self,
        lender_id: UserId,
        time: &SafeTimeProvider,
    ) -> Result<Vec<u32>> {
        let roi = match self.portfolio_roi(lender_id)? {
            Some(roi) => roi,
            None => return Ok(Vec::new()),
        };
        let now = time.now();
        let thresholds = self.thresholds.clone();

        let mut newly = Vec::new();
        self.store.update(
            collections::ROI_MILESTONES,
            &lender_id.to_string(),
            &mut |doc| {
                let mut record = match doc {
                    Some(doc) => from_document::<RoiMilestones>(doc)?,
                    None => RoiMilestones {
                        lender_id,
                        reached: Vec::new(),
                        updated_at: now,
                    },
                };
                // a conditional-update backend may retry the closure
                newly.clear();
                for &threshold in &thresholds {
                    if roi >= Decimal::from(threshold) && !record.reached.contains(&threshold) {
                        record.reached.push(threshold);
                        newly.push(threshold);
                    }
                }
                record.updated_at = now;
                to_document(&record)
            },
        )?;
        Ok(newly)
    }

    /// thresholds already reported for one lender
    pub fn reached(&self, lender_id: UserId) -> Result<Vec<u32>> {
        match self
            .store
            .get(collections::ROI_MILESTONES, &lender_id.to_string())?
        {
            Some(doc) => Ok(from_document::<RoiMilestones>(doc)?.reached),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::schedule::Installment;
    use crate::store::MemoryStore;
    use crate::types::InstallmentStatus;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn fixture() -> (MilestoneTracker, Arc<MemoryStore>, SafeTimeProvider) {
        let store = Arc::new(MemoryStore::new());
        let tracker = MilestoneTracker::new(store.clone(), vec![10, 15, 20, 25, 30]);
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        (tracker, store, time)
    }

    /// store a single-row schedule with the given principal and interest
    fn put_schedule(
        store: &MemoryStore,
        lender_id: UserId,
        principal: i64,
        interest: &str,
        complete: bool,
    ) {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let principal = Money::from_major(principal);
        let interest = Money::from_str_exact(interest).unwrap();
        let schedule = RepaymentSchedule {
            id: Uuid::new_v4(),
            loan_id: Uuid::new_v4(),
            borrower_id: Uuid::new_v4(),
            lender_id,
            total_amount: principal,
            installments: vec![Installment {
                number: 1,
                due_date: created,
                amount: principal + interest,
                principal,
                interest,
                remaining_balance: Money::ZERO,
                status: if complete {
                    InstallmentStatus::Paid
                } else {
                    InstallmentStatus::Pending
                },
                paid_at: complete.then_some(created),
            }],
            created_at: created,
        };
        store
            .put(
                collections::SCHEDULES,
                &schedule.id.to_string(),
                to_document(&schedule).unwrap(),
            )
            .unwrap();
    }

    #[test]
    fn test_no_completed_loans_no_roi() {
        let (tracker, store, time) = fixture();
        let lender = Uuid::new_v4();
        put_schedule(&store, lender, 1_000, "500.00", false);

        assert_eq!(tracker.portfolio_roi(lender).unwrap(), None);
        assert!(tracker.crossed_thresholds(lender, &time).unwrap().is_empty());
        assert!(tracker.reached(lender).unwrap().is_empty());
    }

    #[test]
    fn test_roi_counts_completed_loans_only() {
        let (tracker, store, _) = fixture();
        let lender = Uuid::new_v4();
        put_schedule(&store, lender, 1_000, "150.00", true);
        // a pending loan with huge interest must not move the figure
        put_schedule(&store, lender, 1_000, "900.00", false);

        assert_eq!(tracker.portfolio_roi(lender).unwrap(), Some(dec!(15)));
    }

    #[test]
    fn test_thresholds_fire_once() {
        let (tracker, store, time) = fixture();
        let lender = Uuid::new_v4();
        put_schedule(&store, lender, 1_000, "150.00", true);

        let crossed = tracker.crossed_thresholds(lender, &time).unwrap();
        assert_eq!(crossed, vec![10, 15]);

        // second settlement with the same roi reports nothing new
        let again = tracker.crossed_thresholds(lender, &time).unwrap();
        assert!(again.is_empty());
        assert_eq!(tracker.reached(lender).unwrap(), vec![10, 15]);
    }

    #[test]
    fn test_later_completions_unlock_higher_thresholds() {
        let (tracker, store, time) = fixture();
        let lender = Uuid::new_v4();
        put_schedule(&store, lender, 1_000, "150.00", true);
        assert_eq!(
            tracker.crossed_thresholds(lender, &time).unwrap(),
            vec![10, 15]
        );

        // second completed loan lifts the portfolio to 22.5%
        put_schedule(&store, lender, 1_000, "300.00", true);
        assert_eq!(
            tracker.portfolio_roi(lender).unwrap(),
            Some(dec!(22.5))
        );
        assert_eq!(tracker.crossed_thresholds(lender, &time).unwrap(), vec![20]);
        assert_eq!(tracker.reached(lender).unwrap(), vec![10, 15, 20]);
    }

    #[test]
    fn test_roi_ignores_other_lenders() {
        let (tracker, store, _) = fixture();
        let lender = Uuid::new_v4();
        put_schedule(&store, lender, 1_000, "150.00", true);
        put_schedule(&store, Uuid::new_v4(), 1_000, "900.00", true);

        assert_eq!(tracker.portfolio_roi(lender).unwrap(), Some(dec!(15)));
    }

    #[test]
    fn test_schedule_generation_feeds_roi() {
        let (tracker, store, _) = fixture();
        let lender = Uuid::new_v4();

        // a real generated schedule, fully paid
        let mut schedule = RepaymentSchedule::generate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            lender,
            Money::from_major(100_000),
            Rate::from_percentage(12),
            6,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        for row in &mut schedule.installments {
            row.status = InstallmentStatus::Paid;
        }
        store
            .put(
                collections::SCHEDULES,
                &schedule.id.to_string(),
                to_document(&schedule).unwrap(),
            )
            .unwrap();

        // 3529.04 interest on 100000 principal
        let roi = tracker.portfolio_roi(lender).unwrap().unwrap();
        assert_eq!(roi.round_dp(4), dec!(3.5290));
    }
}
