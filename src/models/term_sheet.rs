use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default SAFE discount when the developer does not specify one.
pub const DEFAULT_DISCOUNT_RATE: f64 = 20.0;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TermSheet {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub investment_amount: f64,
    pub valuation_cap: f64,
    pub discount_rate: f64,
    pub pro_rata_rights: bool,
    pub mfn_clause: bool,
    #[serde(skip_serializing)]
    pub investor_signature: Option<String>,
    pub investor_signed_at: Option<DateTime<Utc>>,
    pub investor_ip: Option<String>,
    #[serde(skip_serializing)]
    pub developer_signature: Option<String>,
    pub developer_signed_at: Option<DateTime<Utc>>,
    pub developer_ip: Option<String>,
    pub status: String,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TermSheet {
    pub fn signed_by(&self, party: SigningParty) -> bool {
        let signature = match party {
            SigningParty::Investor => &self.investor_signature,
            SigningParty::Developer => &self.developer_signature,
        };
        signature.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSheetStatus {
    Draft,
    InvestorSigned,
    Completed,
    Voided,
}

impl TermSheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermSheetStatus::Draft => "draft",
            TermSheetStatus::InvestorSigned => "investor_signed",
            TermSheetStatus::Completed => "completed",
            TermSheetStatus::Voided => "voided",
        }
    }

    /// Status implied by which signatures are present. A developer-only
    /// signature has no state of its own and stays `draft`.
    pub fn from_signatures(investor_signed: bool, developer_signed: bool) -> Self {
        match (investor_signed, developer_signed) {
            (true, true) => TermSheetStatus::Completed,
            (true, false) => TermSheetStatus::InvestorSigned,
            _ => TermSheetStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningParty {
    Investor,
    Developer,
}

impl SigningParty {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningParty::Investor => "investor",
            SigningParty::Developer => "developer",
        }
    }
}

/// Term sheet joined with the parties and project it binds.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TermSheetListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub term_sheet: TermSheet,
    pub project_id: Uuid,
    pub project_title: String,
    pub investor_id: Uuid,
    pub developer_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_requires_both_signatures_in_any_order() {
        assert_eq!(
            TermSheetStatus::from_signatures(true, true),
            TermSheetStatus::Completed
        );
        assert_eq!(
            TermSheetStatus::from_signatures(true, false),
            TermSheetStatus::InvestorSigned
        );
        assert_eq!(
            TermSheetStatus::from_signatures(false, true),
            TermSheetStatus::Draft
        );
        assert_eq!(
            TermSheetStatus::from_signatures(false, false),
            TermSheetStatus::Draft
        );
    }

    #[test]
    fn empty_signature_does_not_count() {
        let now = Utc::now();
        let sheet = TermSheet {
            id: Uuid::nil(),
            offer_id: Uuid::nil(),
            investment_amount: 50_000.0,
            valuation_cap: 5_000_000.0,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            pro_rata_rights: true,
            mfn_clause: false,
            investor_signature: Some(String::new()),
            investor_signed_at: None,
            investor_ip: None,
            developer_signature: Some("data:image/png;base64,AAAA".to_string()),
            developer_signed_at: Some(now),
            developer_ip: None,
            status: TermSheetStatus::Draft.as_str().to_string(),
            document_path: None,
            created_at: now,
            updated_at: now,
        };
        assert!(!sheet.signed_by(SigningParty::Investor));
        assert!(sheet.signed_by(SigningParty::Developer));
    }
}
