use chrono::{DateTime, Utc};

use crate::types::{InstallmentStatus, RepaymentStatus};

const SECONDS_PER_DAY: i64 = 86_400;

/// derive the display status for one installment. a paid raw status always
/// wins; otherwise the days left until the due date, rounded up, decide
/// between overdue, due soon, and pending
pub fn resolve_status(
    raw: InstallmentStatus,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
    due_soon_window_days: i64,
) -> RepaymentStatus {
    if raw == InstallmentStatus::Paid {
        return RepaymentStatus::Paid;
    }

    let days = days_until_due(due_date, now);
    if days < 0 {
        RepaymentStatus::Overdue
    } else if days <= due_soon_window_days {
        RepaymentStatus::DueSoon
    } else {
        RepaymentStatus::Pending
    }
}

/// whole days until the due date, rounded up. an installment counts as
/// overdue only once a full day has passed beyond its due date
pub fn days_until_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (due_date - now).num_seconds();
    (seconds + SECONDS_PER_DAY - 1).div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn resolve(due: DateTime<Utc>, now: DateTime<Utc>) -> RepaymentStatus {
        resolve_status(InstallmentStatus::Pending, due, now, 7)
    }

    #[test]
    fn test_paid_always_wins() {
        let now = base();
        let long_overdue = now - Duration::days(90);
        assert_eq!(
            resolve_status(InstallmentStatus::Paid, long_overdue, now, 7),
            RepaymentStatus::Paid
        );
    }

    #[test]
    fn test_overdue_after_a_full_day() {
        let now = base();
        assert_eq!(resolve(now - Duration::days(1), now), RepaymentStatus::Overdue);
        assert_eq!(resolve(now - Duration::days(30), now), RepaymentStatus::Overdue);
    }

    #[test]
    fn test_just_past_due_still_counts_as_today() {
        let now = base();
        // less than a full day late rounds up to zero days
        let due = now - Duration::hours(23) - Duration::minutes(59);
        assert_eq!(days_until_due(due, now), 0);
        assert_eq!(resolve(due, now), RepaymentStatus::DueSoon);
    }

    #[test]
    fn test_due_soon_window_boundaries() {
        let now = base();

        assert_eq!(resolve(now, now), RepaymentStatus::DueSoon);
        assert_eq!(resolve(now + Duration::days(7), now), RepaymentStatus::DueSoon);

        // one second past the window rounds up to eight days
        let beyond = now + Duration::days(7) + Duration::seconds(1);
        assert_eq!(days_until_due(beyond, now), 8);
        assert_eq!(resolve(beyond, now), RepaymentStatus::Pending);
    }

    #[test]
    fn test_partial_days_round_up() {
        let now = base();
        assert_eq!(days_until_due(now + Duration::hours(1), now), 1);
        assert_eq!(days_until_due(now + Duration::days(3), now), 3);
        assert_eq!(
            days_until_due(now + Duration::days(3) + Duration::seconds(1), now),
            4
        );
    }

    #[test]
    fn test_window_is_configurable() {
        let now = base();
        let due = now + Duration::days(3);
        assert_eq!(
            resolve_status(InstallmentStatus::Pending, due, now, 2),
            RepaymentStatus::Pending
        );
        assert_eq!(
            resolve_status(InstallmentStatus::Pending, due, now, 3),
            RepaymentStatus::DueSoon
        );
    }
}
