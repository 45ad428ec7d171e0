use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Months an NDA stays in force after signing.
pub const NDA_VALIDITY_MONTHS: u32 = 24;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Nda {
    pub id: Uuid,
    pub investor_id: Uuid,
    #[serde(skip_serializing)]
    pub signature_data: String,
    pub signed_name: String,
    pub ip_address: String,
    pub user_agent: String,
    pub signed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub version: String,
    pub document_hash: String,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Nda {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Expiry for an NDA signed at `signed_at`. A day missing from the target
/// month rolls over into the next one, so 29 Feb expires on 1 Mar.
pub fn nda_expiry(signed_at: DateTime<Utc>) -> DateTime<Utc> {
    let Some(expiry) = signed_at.checked_add_months(Months::new(NDA_VALIDITY_MONTHS)) else {
        return DateTime::<Utc>::MAX_UTC;
    };
    let overflow = i64::from(signed_at.day()) - i64::from(expiry.day());
    expiry
        .checked_add_signed(Duration::days(overflow))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
