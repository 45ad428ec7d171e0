use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days an offer stays open before it lapses.
pub const OFFER_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct InvestmentOffer {
    pub id: Uuid,
    pub investor_id: Uuid,
    pub project_id: Uuid,
    pub offer_amount: f64,
    pub equity_requested: f64,
    pub notes: String,
    pub status: String,
    pub response_notes: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestmentOffer {
    /// Pending and not yet past its expiry.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Pending.as_str() && now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    Expired,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Withdrawn => "withdrawn",
            OfferStatus::Expired => "expired",
        }
    }
}

/// Offer joined with the names both sides see in their dashboards.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OfferListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub offer: InvestmentOffer,
    pub project_title: String,
    pub developer_id: Uuid,
    pub investor_name: String,
    pub investor_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offer(status: OfferStatus, expires_in: Duration) -> InvestmentOffer {
        let now = Utc::now();
        InvestmentOffer {
            id: Uuid::nil(),
            investor_id: Uuid::nil(),
            project_id: Uuid::nil(),
            offer_amount: 25_000.0,
            equity_requested: 2.5,
            notes: String::new(),
            status: status.as_str().to_string(),
            response_notes: None,
            expires_at: now + expires_in,
            responded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pending_offer_before_expiry_is_open() {
        assert!(offer(OfferStatus::Pending, Duration::days(1)).is_open_at(Utc::now()));
    }

    #[test]
    fn lapsed_or_settled_offers_are_closed() {
        let now = Utc::now();
        assert!(!offer(OfferStatus::Pending, Duration::seconds(-1)).is_open_at(now));
        assert!(!offer(OfferStatus::Accepted, Duration::days(1)).is_open_at(now));
        assert!(!offer(OfferStatus::Withdrawn, Duration::days(1)).is_open_at(now));
    }
}
