use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_investors: i64,
    pub total_developers: i64,
    pub total_projects: i64,
    pub approved_projects: i64,
    pub pending_projects: i64,
    pub total_offers: i64,
    pub accepted_offers: i64,
    pub completed_payments: i64,
    /// Sum of completed payments, in minor currency units.
    pub total_revenue: i64,
}

pub async fn platform(pool: &PgPool) -> Result<PlatformStats, sqlx::Error> {
    sqlx::query_as::<_, PlatformStats>(
        "SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE role = 'investor') AS total_investors,
            (SELECT COUNT(*) FROM users WHERE role = 'developer') AS total_developers,
            (SELECT COUNT(*) FROM projects) AS total_projects,
            (SELECT COUNT(*) FROM projects WHERE status = 'approved') AS approved_projects,
            (SELECT COUNT(*) FROM projects WHERE status = 'pending') AS pending_projects,
            (SELECT COUNT(*) FROM investment_offers) AS total_offers,
            (SELECT COUNT(*) FROM investment_offers WHERE status = 'accepted') AS accepted_offers,
            (SELECT COUNT(*) FROM payments WHERE status = 'completed') AS completed_payments,
            (SELECT COALESCE(SUM(amount), 0)::BIGINT FROM payments WHERE status = 'completed')
                AS total_revenue",
    )
    .fetch_one(pool)
    .await
}
