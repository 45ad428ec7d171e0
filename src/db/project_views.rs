use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ViewedProject;

pub async fn exists<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    investor_id: Uuid,
    project_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM project_views WHERE investor_id = $1 AND project_id = $2)",
    )
    .bind(investor_id)
    .bind(project_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Record a first view. Returns false if the pair was already recorded.
pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    investor_id: Uuid,
    project_id: Uuid,
    payment_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO project_views (investor_id, project_id, payment_id)
         VALUES ($1, $2, $3)
         ON CONFLICT (investor_id, project_id) DO NOTHING",
    )
    .bind(investor_id)
    .bind(project_id)
    .bind(payment_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_for_investor(
    pool: &PgPool,
    investor_id: Uuid,
) -> Result<Vec<ViewedProject>, sqlx::Error> {
    sqlx::query_as::<_, ViewedProject>(
        "SELECT p.id, p.title, p.tagline, p.category_id, c.name AS category_name,
                p.min_investment,
                (SELECT i.file_path FROM project_images i
                  WHERE i.project_id = p.id AND i.is_primary LIMIT 1) AS primary_image,
                p.created_at, v.payment_id, v.viewed_at
         FROM project_views v
         JOIN projects p ON p.id = v.project_id
         JOIN categories c ON c.id = p.category_id
         WHERE v.investor_id = $1
         ORDER BY v.viewed_at DESC",
    )
    .bind(investor_id)
    .fetch_all(pool)
    .await
}
