use axum::extract::State;
use axum::Json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{DeveloperProject, OfferListing, TermSheetListing};
use crate::state::SharedState;

/// The developer's listings in every status, with open offer counts.
pub async fn projects(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<DeveloperProject>>, AppError> {
    auth.require_developer()?;
    let projects = db::projects::list_by_developer(&state.pool, auth.user_id).await?;
    Ok(Json(projects))
}

pub async fn offers(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<OfferListing>>, AppError> {
    auth.require_developer()?;
    db::offers::expire_due(&state.pool).await?;
    let offers = db::offers::list_for_developer(&state.pool, auth.user_id).await?;
    Ok(Json(offers))
}

pub async fn term_sheets(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<TermSheetListing>>, AppError> {
    auth.require_developer()?;
    let sheets = db::term_sheets::list_for_party(&state.pool, auth.user_id).await?;
    Ok(Json(sheets))
}
