use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use uuid::Uuid;

use super::auth::MessageResponse;
use super::projects::owned_project;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::ProjectImage;
use crate::state::SharedState;
use crate::storage;

pub async fn upload(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ProjectImage>), AppError> {
    auth.require_developer()?;
    owned_project(&state, project_id, auth.user_id).await?;

    let upload = storage::parse_image_upload(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let public_path = storage::save_project_image(&state.config.upload_dir, project_id, &upload)
        .await
        .map_err(AppError::Internal)?;

    let image = match db::project_images::insert(
        &state.pool,
        project_id,
        &public_path,
        &upload.file_name,
        &upload.caption,
        upload.is_primary,
    )
    .await
    {
        Ok(image) => image,
        Err(e) => {
            storage::remove_project_image(&state.config.upload_dir, &public_path).await;
            return Err(e.into());
        }
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.image_uploaded",
        "project",
        Some(project_id),
        Some(serde_json::json!({ "image_id": image.id })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((project_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_developer()?;
    owned_project(&state, project_id, auth.user_id).await?;

    let image = db::project_images::delete(&state.pool, image_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    storage::remove_project_image(&state.config.upload_dir, &image.file_path).await;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.image_deleted",
        "project",
        Some(project_id),
        Some(serde_json::json!({ "image_id": image_id })),
    )
    .await;

    Ok(MessageResponse::new("Image deleted successfully"))
}
