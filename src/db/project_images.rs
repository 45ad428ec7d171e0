use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ProjectImage;

pub async fn list_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ProjectImage>, sqlx::Error> {
    sqlx::query_as::<_, ProjectImage>(
        "SELECT * FROM project_images WHERE project_id = $1 ORDER BY display_order, created_at",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

/// Append an image to a project's gallery. The first image is always primary,
/// and a new primary image demotes the previous one.
pub async fn insert(
    pool: &PgPool,
    project_id: Uuid,
    file_path: &str,
    file_name: &str,
    caption: &str,
    want_primary: bool,
) -> Result<ProjectImage, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // Serializes concurrent uploads to the same project.
    sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    let (existing, next_order): (i64, i32) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(MAX(display_order) + 1, 0)
         FROM project_images WHERE project_id = $1",
    )
    .bind(project_id)
    .fetch_one(&mut *tx)
    .await?;

    let is_primary = want_primary || existing == 0;
    if is_primary && existing > 0 {
        sqlx::query("UPDATE project_images SET is_primary = false WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
    }

    let image = sqlx::query_as::<_, ProjectImage>(
        "INSERT INTO project_images (project_id, file_path, file_name, caption, display_order, is_primary)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(project_id)
    .bind(file_path)
    .bind(file_name)
    .bind(caption)
    .bind(next_order)
    .bind(is_primary)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(image)
}

/// Remove an image, promoting the next one in display order if the primary
/// image was removed.
pub async fn delete(
    pool: &PgPool,
    id: Uuid,
    project_id: Uuid,
) -> Result<Option<ProjectImage>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query_as::<_, ProjectImage>(
        "DELETE FROM project_images WHERE id = $1 AND project_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(project_id)
    .fetch_optional(&mut *tx)
    .await?;

    if removed.as_ref().is_some_and(|img| img.is_primary) {
        sqlx::query(
            "UPDATE project_images SET is_primary = true
             WHERE id = (SELECT id FROM project_images WHERE project_id = $1
                         ORDER BY display_order, created_at LIMIT 1)",
        )
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed)
}
