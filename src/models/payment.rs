use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchased bundle of project views.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub investor_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub gateway_payment_id: Option<String>,
    pub status: String,
    pub projects_remaining: i32,
    pub projects_total: i32,
    pub description: String,
    pub receipt_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_active(&self) -> bool {
        self.status == PaymentStatus::Completed.as_str() && self.projects_remaining > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Payment row joined with the investor's identity, for the admin ledger.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: Payment,
    pub investor_email: String,
    pub investor_name: String,
}
