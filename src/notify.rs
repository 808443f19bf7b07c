use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

use crate::errors::{LendingError, Result};
use crate::types::UserId;

/// notification kinds emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// admin: a new escrow awaits review
    EscrowPending,
    /// lender: funding committed, escrow opened
    FundingConfirmed,
    /// lender: escrow approved by an admin
    EscrowApproved,
    /// borrower: escrow released, funds in wallet
    FundsDisbursed,
    /// lender: escrow refunded, funds returned
    EscrowRefunded,
    /// lender: an installment was paid
    PaymentReceived,
    /// lender: every installment paid
    LoanCompleted,
    /// lender: portfolio roi crossed a threshold
    RoiMilestone,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EscrowPending => "escrow_pending",
            NotificationKind::FundingConfirmed => "funding_confirmed",
            NotificationKind::EscrowApproved => "escrow_approved",
            NotificationKind::FundsDisbursed => "funds_disbursed",
            NotificationKind::EscrowRefunded => "escrow_refunded",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::LoanCompleted => "loan_completed",
            NotificationKind::RoiMilestone => "roi_milestone",
        }
    }
}

/// notification priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// one notification addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub priority: NotificationPriority,
    pub context: Value,
}

impl Notification {
    /// create with normal priority and empty context
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
            context: Value::Null,
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// delivery seam for user notifications
pub trait Notifier: Send + Sync {
    /// deliver one notification; callers treat failures as advisory
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// lookup seam for platform administrators
pub trait AdminDirectory: Send + Sync {
    /// user ids that receive escrow review notifications
    fn admin_user_ids(&self) -> Result<Vec<UserId>>;
}

/// in-memory notifier collecting deliveries for tests and demos
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// everything delivered so far
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// drain delivered notifications
    pub fn take_sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }

    /// deliveries addressed to one user
    pub fn sent_to(&self, user_id: UserId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        let mut sent = self.sent.lock().map_err(|_| LendingError::Store {
            message: "notifier lock poisoned".to_string(),
        })?;
        sent.push(notification);
        Ok(())
    }
}

/// fixed list of administrators
#[derive(Debug, Clone, Default)]
pub struct StaticAdminDirectory {
    admins: Vec<UserId>,
}

impl StaticAdminDirectory {
    pub fn new(admins: Vec<UserId>) -> Self {
        Self { admins }
    }
}

impl AdminDirectory for StaticAdminDirectory {
    fn admin_user_ids(&self) -> Result<Vec<UserId>> {
        Ok(self.admins.clone())
    }
}
