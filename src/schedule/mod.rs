pub mod amortization;
pub mod status;

pub use amortization::{Installment, RepaymentSchedule};
pub use status::{days_until_due, resolve_status};
