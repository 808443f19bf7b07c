pub mod config;
pub mod decimal;
pub mod errors;
pub mod escrow;
pub mod funding;
pub mod history;
pub mod loan;
pub mod milestones;
pub mod notify;
pub mod schedule;
pub mod serialization;
pub mod settlement;
pub mod store;
pub mod types;
pub mod wallet;

// re-export key types
pub use config::{EngineConfig, FundingConfig, MilestoneConfig, RepaymentConfig};
pub use decimal::{Money, Rate};
pub use errors::{LendingError, Result};
pub use escrow::{Escrow, EscrowLedger};
pub use funding::{FundingOrchestrator, FundingOutcome};
pub use history::{TransactionHistory, TransactionRecord};
pub use loan::Loan;
pub use milestones::{MilestoneTracker, RoiMilestones};
pub use notify::{
    AdminDirectory, MemoryNotifier, Notification, NotificationKind, NotificationPriority,
    Notifier, StaticAdminDirectory,
};
pub use schedule::{days_until_due, resolve_status, Installment, RepaymentSchedule};
pub use serialization::{EscrowView, InstallmentView, LoanView, ScheduleView};
pub use settlement::{SettlementOutcome, SettlementService};
pub use store::{DocumentStore, MemoryStore};
pub use types::{
    EscrowId, EscrowStatus, InstallmentStatus, LoanId, LoanStatus, RepaymentStatus, ScheduleId,
    TransactionId, TransactionKind, UserId,
};
pub use wallet::{Wallet, WalletLedger};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
