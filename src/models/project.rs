use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub developer_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub tagline: String,
    pub description: String,
    pub pitch_content: String,
    pub problem: String,
    pub solution: String,
    pub target_market: String,
    pub business_model: String,
    pub traction: String,
    pub team: String,
    pub min_investment: f64,
    pub max_investment: f64,
    pub equity_offered: f64,
    pub valuation_cap: f64,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn status(&self) -> Option<ProjectStatus> {
        ProjectStatus::parse(&self.status)
    }
}

/// Listing lifecycle: `draft|rejected -> pending -> approved|rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Pending => "pending",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProjectStatus::Draft),
            "pending" => Some(ProjectStatus::Pending),
            "approved" => Some(ProjectStatus::Approved),
            "rejected" => Some(ProjectStatus::Rejected),
            _ => None,
        }
    }

    /// Only drafts and rejected listings may be edited or (re)submitted.
    pub fn is_editable(&self) -> bool {
        matches!(self, ProjectStatus::Draft | ProjectStatus::Rejected)
    }
}

/// The teaser shown to everyone before a project is unlocked.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProjectPublic {
    pub id: Uuid,
    pub title: String,
    pub tagline: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub min_investment: f64,
    pub primary_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProjectImage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_path: String,
    pub file_name: String,
    pub caption: String,
    pub display_order: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// A project the investor has unlocked, with the teaser fields for display.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ViewedProject {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: ProjectPublic,
    pub payment_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DeveloperProject {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub category_name: String,
    pub pending_offers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_draft_and_rejected_are_editable() {
        assert!(ProjectStatus::Draft.is_editable());
        assert!(ProjectStatus::Rejected.is_editable());
        assert!(!ProjectStatus::Pending.is_editable());
        assert!(!ProjectStatus::Approved.is_editable());
    }

    #[test]
    fn unknown_status_does_not_parse() {
        assert_eq!(ProjectStatus::parse("approved"), Some(ProjectStatus::Approved));
        assert_eq!(ProjectStatus::parse("archived"), None);
    }
}
