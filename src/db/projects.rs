use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DeveloperProject, Project, ProjectPublic};

/// Every editable column of a listing. Updates replace all of them.
pub struct ProjectInput<'a> {
    pub category_id: Uuid,
    pub title: &'a str,
    pub tagline: &'a str,
    pub description: &'a str,
    pub pitch_content: &'a str,
    pub problem: &'a str,
    pub solution: &'a str,
    pub target_market: &'a str,
    pub business_model: &'a str,
    pub traction: &'a str,
    pub team: &'a str,
    pub min_investment: f64,
    pub max_investment: f64,
    pub equity_offered: f64,
    pub valuation_cap: f64,
}

const PUBLIC_COLUMNS: &str = "p.id, p.title, p.tagline, p.category_id, c.name AS category_name,
    p.min_investment,
    (SELECT i.file_path FROM project_images i
      WHERE i.project_id = p.id AND i.is_primary LIMIT 1) AS primary_image,
    p.created_at";

pub async fn list_approved(
    pool: &PgPool,
    category_id: Option<Uuid>,
    search: Option<&str>,
) -> Result<Vec<ProjectPublic>, sqlx::Error> {
    let pattern = search.map(|s| format!("%{}%", escape_like(s)));
    sqlx::query_as::<_, ProjectPublic>(&format!(
        "SELECT {PUBLIC_COLUMNS}
         FROM projects p JOIN categories c ON c.id = p.category_id
         WHERE p.status = 'approved'
           AND ($1::uuid IS NULL OR p.category_id = $1)
           AND ($2::text IS NULL OR p.title ILIKE $2 OR p.tagline ILIKE $2)
         ORDER BY p.approved_at DESC NULLS LAST, p.created_at DESC"
    ))
    .bind(category_id)
    .bind(pattern)
    .fetch_all(pool)
    .await
}

pub async fn find_public(pool: &PgPool, id: Uuid) -> Result<Option<ProjectPublic>, sqlx::Error> {
    sqlx::query_as::<_, ProjectPublic>(&format!(
        "SELECT {PUBLIC_COLUMNS}
         FROM projects p JOIN categories c ON c.id = p.category_id
         WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn create(
    pool: &PgPool,
    developer_id: Uuid,
    input: &ProjectInput<'_>,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects (developer_id, category_id, title, tagline, description,
                               pitch_content, problem, solution, target_market, business_model,
                               traction, team, min_investment, max_investment, equity_offered,
                               valuation_cap)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
         RETURNING *",
    )
    .bind(developer_id)
    .bind(input.category_id)
    .bind(input.title)
    .bind(input.tagline)
    .bind(input.description)
    .bind(input.pitch_content)
    .bind(input.problem)
    .bind(input.solution)
    .bind(input.target_market)
    .bind(input.business_model)
    .bind(input.traction)
    .bind(input.team)
    .bind(input.min_investment)
    .bind(input.max_investment)
    .bind(input.equity_offered)
    .bind(input.valuation_cap)
    .fetch_one(pool)
    .await
}

/// Overwrite a listing. Returns `None` when the project is not owned by
/// `developer_id` or is no longer editable.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    developer_id: Uuid,
    input: &ProjectInput<'_>,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET
            category_id = $3, title = $4, tagline = $5, description = $6, pitch_content = $7,
            problem = $8, solution = $9, target_market = $10, business_model = $11,
            traction = $12, team = $13, min_investment = $14, max_investment = $15,
            equity_offered = $16, valuation_cap = $17, updated_at = now()
         WHERE id = $1 AND developer_id = $2 AND status IN ('draft', 'rejected')
         RETURNING *",
    )
    .bind(id)
    .bind(developer_id)
    .bind(input.category_id)
    .bind(input.title)
    .bind(input.tagline)
    .bind(input.description)
    .bind(input.pitch_content)
    .bind(input.problem)
    .bind(input.solution)
    .bind(input.target_market)
    .bind(input.business_model)
    .bind(input.traction)
    .bind(input.team)
    .bind(input.min_investment)
    .bind(input.max_investment)
    .bind(input.equity_offered)
    .bind(input.valuation_cap)
    .fetch_optional(pool)
    .await
}

pub async fn submit(
    pool: &PgPool,
    id: Uuid,
    developer_id: Uuid,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET status = 'pending', rejection_reason = NULL, updated_at = now()
         WHERE id = $1 AND developer_id = $2 AND status IN ('draft', 'rejected')
         RETURNING *",
    )
    .bind(id)
    .bind(developer_id)
    .fetch_optional(pool)
    .await
}

/// Settle a pending listing. Returns `None` if it was not pending.
pub async fn review(
    pool: &PgPool,
    id: Uuid,
    admin_id: Uuid,
    approved: bool,
    reason: Option<&str>,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET
            status = CASE WHEN $3 THEN 'approved' ELSE 'rejected' END,
            rejection_reason = CASE WHEN $3 THEN NULL ELSE $4 END,
            approved_at = CASE WHEN $3 THEN now() ELSE NULL END,
            approved_by = CASE WHEN $3 THEN $2 ELSE NULL END,
            updated_at = now()
         WHERE id = $1 AND status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .bind(admin_id)
    .bind(approved)
    .bind(reason)
    .fetch_optional(pool)
    .await
}

pub async fn list_by_developer(
    pool: &PgPool,
    developer_id: Uuid,
) -> Result<Vec<DeveloperProject>, sqlx::Error> {
    sqlx::query_as::<_, DeveloperProject>(
        "SELECT p.*, c.name AS category_name,
                (SELECT COUNT(*) FROM investment_offers o
                  WHERE o.project_id = p.id AND o.status = 'pending'
                    AND o.expires_at > now()) AS pending_offers
         FROM projects p JOIN categories c ON c.id = p.category_id
         WHERE p.developer_id = $1
         ORDER BY p.created_at DESC",
    )
    .bind(developer_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &PgPool, status: Option<&str>) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC",
    )
    .bind(status)
    .fetch_all(pool)
    .await
}

/// Moderation queue, oldest submission first.
pub async fn list_pending(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE status = 'pending' ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await
}

pub async fn increment_view_count<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET view_count = view_count + 1 WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_ai"), "100\\%\\_ai");
        assert_eq!(escape_like("plain"), "plain");
    }
}
