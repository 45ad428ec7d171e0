use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::{AppError, GateDenial};
use crate::models::Role;
use crate::state::SharedState;

/// Rejects investors that do not hold an unexpired NDA. Other roles pass
/// through untouched; unauthenticated requests get 401 from the extractor.
pub async fn require_nda(
    State(state): State<SharedState>,
    auth: AuthUser,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if auth.role == Role::Investor {
        check_nda(&state.pool, auth.user_id).await?;
    }
    Ok(next.run(req).await)
}

pub async fn check_nda(pool: &PgPool, investor_id: Uuid) -> Result<(), AppError> {
    match db::ndas::latest_for_investor(pool, investor_id).await? {
        None => Err(GateDenial::NdaRequired.into()),
        Some(nda) if !nda.is_valid_at(Utc::now()) => Err(GateDenial::NdaExpired.into()),
        Some(_) => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    /// The investor had already unlocked this project; nothing was spent.
    AlreadyViewed,
    /// One credit was spent. Carries the credits left in the bundle.
    Consumed { projects_remaining: i32 },
}

/// Grant an investor full access to `project_id`, spending a view credit on
/// the first visit only.
///
/// The whole check runs in one transaction: the active bundle is locked with
/// `FOR UPDATE`, the view row is inserted with `ON CONFLICT DO NOTHING`, and the
/// decrement is guarded by `projects_remaining > 0`. Losing the insert race to
/// a concurrent request counts as already viewed.
pub async fn unlock_project(
    pool: &PgPool,
    investor_id: Uuid,
    project_id: Uuid,
) -> Result<Unlock, AppError> {
    if db::project_views::exists(pool, investor_id, project_id).await? {
        return Ok(Unlock::AlreadyViewed);
    }

    let mut tx = pool.begin().await?;

    let Some(payment) = db::payments::lock_active(&mut *tx, investor_id).await? else {
        let denial = if db::payments::has_completed(&mut *tx, investor_id).await? {
            GateDenial::NoViewsRemaining
        } else {
            GateDenial::PaymentRequired
        };
        return Err(denial.into());
    };

    if !db::project_views::insert(&mut *tx, investor_id, project_id, payment.id).await? {
        return Ok(Unlock::AlreadyViewed);
    }

    if !db::payments::consume_credit(&mut *tx, payment.id).await? {
        return Err(GateDenial::NoViewsRemaining.into());
    }
    db::projects::increment_view_count(&mut *tx, project_id).await?;

    tx.commit().await?;

    tracing::info!(%investor_id, %project_id, payment_id = %payment.id, "Project unlocked");
    Ok(Unlock::Consumed {
        projects_remaining: payment.projects_remaining - 1,
    })
}

/// Credits left in the investor's active bundle, or 0.
pub async fn remaining_views(pool: &PgPool, investor_id: Uuid) -> Result<i32, AppError> {
    Ok(db::payments::find_active(pool, investor_id)
        .await?
        .map(|p| p.projects_remaining)
        .unwrap_or(0))
}
