use axum::extract::State;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::Category;
use crate::state::SharedState;

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Category>>, AppError> {
    let categories = db::categories::list(&state.pool).await?;
    Ok(Json(categories))
}
