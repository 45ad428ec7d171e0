use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::MessageResponse;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::stats::PlatformStats;
use crate::error::{AppError, is_unique_violation};
use crate::middleware::audit;
use crate::models::{
    AuditEvent, Category, OfferListing, PaymentListing, Project, ProjectStatus, Role, TermSheet,
    User,
};
use crate::state::SharedState;

const DEFAULT_AUDIT_LIMIT: i64 = 50;
const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct RoleFilter {
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub resource_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub approved: bool,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn category_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("A category with this name already exists".to_string())
    } else {
        AppError::Database(e)
    }
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<PlatformStats>, AppError> {
    auth.require_admin()?;
    Ok(Json(db::stats::platform(&state.pool).await?))
}

pub async fn list_users(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<RoleFilter>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_admin()?;
    let role = match non_empty(&q.role) {
        Some(r) => Some(
            Role::parse(r)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown role '{r}'")))?
                .as_str(),
        ),
        None => None,
    };
    Ok(Json(db::users::list(&state.pool, role).await?))
}

pub async fn list_projects(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<StatusFilter>,
) -> Result<Json<Vec<Project>>, AppError> {
    auth.require_admin()?;
    let status = match non_empty(&q.status) {
        Some(s) => Some(
            ProjectStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown project status '{s}'")))?
                .as_str(),
        ),
        None => None,
    };
    Ok(Json(db::projects::list_all(&state.pool, status).await?))
}

pub async fn pending_projects(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    auth.require_admin()?;
    Ok(Json(db::projects::list_pending(&state.pool).await?))
}

/// Approve or reject a pending listing. Rejections must carry a reason the
/// developer can act on.
pub async fn review_project(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<Project>, AppError> {
    auth.require_admin()?;

    let reason = non_empty(&req.reason);
    if !req.approved && reason.is_none() {
        return Err(AppError::BadRequest(
            "A reason is required when rejecting a project".to_string(),
        ));
    }

    let Some(project) =
        db::projects::review(&state.pool, id, auth.user_id, req.approved, reason).await?
    else {
        return match db::projects::find_by_id(&state.pool, id).await? {
            Some(existing) => Err(AppError::Conflict(format!(
                "Only pending projects can be reviewed (current status: {})",
                existing.status
            ))),
            None => Err(AppError::NotFound("Project not found".to_string())),
        };
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        if req.approved {
            "project.approved"
        } else {
            "project.rejected"
        },
        "project",
        Some(project.id),
        reason.map(|r| serde_json::json!({ "reason": r })),
    )
    .await;

    if let Some(developer) = db::users::find_by_id(&state.pool, project.developer_id).await? {
        state.notifier.project_reviewed(
            &developer.email,
            &developer.full_name(),
            &project.title,
            req.approved,
            project.rejection_reason.as_deref(),
        );
    }

    Ok(Json(project))
}

pub async fn list_offers(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<StatusFilter>,
) -> Result<Json<Vec<OfferListing>>, AppError> {
    auth.require_admin()?;
    db::offers::expire_due(&state.pool).await?;
    Ok(Json(db::offers::list_all(&state.pool, non_empty(&q.status)).await?))
}

pub async fn list_payments(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<PaymentListing>>, AppError> {
    auth.require_admin()?;
    Ok(Json(db::payments::list_all(&state.pool).await?))
}

pub async fn void_term_sheet(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TermSheet>, AppError> {
    auth.require_admin()?;

    let Some(sheet) = db::term_sheets::void(&state.pool, id).await? else {
        return match db::term_sheets::find_listing(&state.pool, id).await? {
            Some(existing) => Err(AppError::Conflict(format!(
                "Term sheet cannot be voided (current status: {})",
                existing.term_sheet.status
            ))),
            None => Err(AppError::NotFound("Term sheet not found".to_string())),
        };
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "term_sheet.voided",
        "term_sheet",
        Some(sheet.id),
        None,
    )
    .await;

    Ok(Json(sheet))
}

pub async fn create_category(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    auth.require_admin()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Category name is required".to_string()));
    }

    let category = db::categories::create(
        &state.pool,
        name,
        req.description.trim(),
        req.icon.trim(),
    )
    .await
    .map_err(category_conflict)?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "category.created",
        "category",
        Some(category.id),
        Some(serde_json::json!({ "name": category.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategory>,
) -> Result<Json<Category>, AppError> {
    auth.require_admin()?;

    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("Category name cannot be empty".to_string()));
    }

    let category = db::categories::update(
        &state.pool,
        id,
        req.name.as_deref().map(str::trim),
        req.description.as_deref().map(str::trim),
        req.icon.as_deref().map(str::trim),
    )
    .await
    .map_err(category_conflict)?
    .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "category.updated",
        "category",
        Some(category.id),
        None,
    )
    .await;

    Ok(Json(category))
}

pub async fn delete_category(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    auth.require_admin()?;

    let in_use = db::categories::count_projects(&state.pool, id).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category is used by {in_use} project(s) and cannot be deleted"
        )));
    }
    // A concurrent insert still trips the foreign key.
    let deleted = db::categories::delete(&state.pool, id).await.map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::Conflict("Category is in use and cannot be deleted".to_string())
        }
        _ => AppError::Database(e),
    })?;
    if !deleted {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "category.deleted",
        "category",
        Some(id),
        None,
    )
    .await;

    Ok(MessageResponse::new("Category deleted successfully"))
}

pub async fn audit_log(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    auth.require_admin()?;
    let limit = q.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);
    let offset = q.offset.unwrap_or(0).max(0);
    let events =
        db::audit::list(&state.pool, non_empty(&q.resource_type), limit, offset).await?;
    Ok(Json(events))
}
