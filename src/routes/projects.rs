use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::access_gate::{self, Unlock};
use crate::middleware::audit;
use crate::models::{Category, Project, ProjectImage, ProjectPublic, ProjectStatus, Role, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct ProjectRequest {
    pub category_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pitch_content: String,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub target_market: String,
    #[serde(default)]
    pub business_model: String,
    #[serde(default)]
    pub traction: String,
    #[serde(default)]
    pub team: String,
    pub min_investment: f64,
    #[serde(default)]
    pub max_investment: f64,
    #[serde(default)]
    pub equity_offered: f64,
    #[serde(default)]
    pub valuation_cap: f64,
}

impl ProjectRequest {
    fn validate(&self) -> Result<db::projects::ProjectInput<'_>, AppError> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > 200 {
            return Err(AppError::BadRequest(
                "Title is required and must be at most 200 characters".to_string(),
            ));
        }
        if !self.min_investment.is_finite() || self.min_investment <= 0.0 {
            return Err(AppError::BadRequest(
                "Minimum investment must be greater than zero".to_string(),
            ));
        }
        if !self.max_investment.is_finite()
            || (self.max_investment > 0.0 && self.max_investment < self.min_investment)
        {
            return Err(AppError::BadRequest(
                "Maximum investment cannot be below the minimum".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.equity_offered) {
            return Err(AppError::BadRequest(
                "Equity offered must be between 0 and 100 percent".to_string(),
            ));
        }
        if !self.valuation_cap.is_finite() || self.valuation_cap < 0.0 {
            return Err(AppError::BadRequest(
                "Valuation cap cannot be negative".to_string(),
            ));
        }

        Ok(db::projects::ProjectInput {
            category_id: self.category_id,
            title,
            tagline: self.tagline.trim(),
            description: self.description.trim(),
            pitch_content: &self.pitch_content,
            problem: &self.problem,
            solution: &self.solution,
            target_market: &self.target_market,
            business_model: &self.business_model,
            traction: &self.traction,
            team: &self.team,
            min_investment: self.min_investment,
            max_investment: self.max_investment,
            equity_offered: self.equity_offered,
            valuation_cap: self.valuation_cap,
        })
    }
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ProjectBody {
    Full(Project),
    Public(ProjectPublic),
}

/// Contact details revealed once a project is unlocked.
#[derive(Serialize)]
pub struct DeveloperContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
}

impl From<User> for DeveloperContact {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email,
            phone: user.phone,
            company_name: user.company_name,
        }
    }
}

#[derive(Serialize)]
pub struct ProjectDetail {
    pub full_access: bool,
    pub project: ProjectBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub images: Vec<ProjectImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer: Option<DeveloperContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_remaining: Option<i32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub newly_unlocked: bool,
}

/// Approved listings, newest first. Public.
pub async fn list(
    State(state): State<SharedState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ProjectPublic>>, AppError> {
    let category_id = match q.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<Uuid>()
                .map_err(|_| AppError::BadRequest("Invalid category id".to_string()))?,
        ),
    };
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let projects = db::projects::list_approved(&state.pool, category_id, search).await?;
    Ok(Json(projects))
}

/// Project detail. Investors pass the NDA layer before reaching this handler
/// and spend a view credit on their first visit.
pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectDetail>, AppError> {
    let not_found = || AppError::NotFound("Project not found".to_string());
    let project = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let approved = project.status() == Some(ProjectStatus::Approved);

    let mut projects_remaining = None;
    let mut newly_unlocked = false;
    match auth.role {
        Role::Admin => {}
        Role::Developer if project.developer_id == auth.user_id => {}
        Role::Developer => {
            if !approved {
                return Err(not_found());
            }
            let public = db::projects::find_public(&state.pool, id)
                .await?
                .ok_or_else(not_found)?;
            return Ok(Json(ProjectDetail {
                full_access: false,
                project: ProjectBody::Public(public),
                category: None,
                images: Vec::new(),
                developer: None,
                projects_remaining: None,
                newly_unlocked: false,
            }));
        }
        Role::Investor => {
            if !approved {
                return Err(not_found());
            }
            match access_gate::unlock_project(&state.pool, auth.user_id, id).await? {
                Unlock::AlreadyViewed => {
                    projects_remaining =
                        Some(access_gate::remaining_views(&state.pool, auth.user_id).await?);
                }
                Unlock::Consumed {
                    projects_remaining: left,
                } => {
                    projects_remaining = Some(left);
                    newly_unlocked = true;
                    audit::log_event(
                        &state.pool,
                        Some(auth.user_id),
                        "project.unlocked",
                        "project",
                        Some(id),
                        Some(serde_json::json!({ "projects_remaining": left })),
                    )
                    .await;
                }
            }
        }
    }

    let category = db::categories::find_by_id(&state.pool, project.category_id).await?;
    let images = db::project_images::list_for_project(&state.pool, id).await?;
    let developer = db::users::find_by_id(&state.pool, project.developer_id)
        .await?
        .map(DeveloperContact::from);

    Ok(Json(ProjectDetail {
        full_access: true,
        project: ProjectBody::Full(project),
        category,
        images,
        developer,
        projects_remaining,
        newly_unlocked,
    }))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    auth.require_developer()?;
    let input = req.validate()?;
    ensure_category(&state, input.category_id).await?;

    let project = db::projects::create(&state.pool, auth.user_id, &input).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.created",
        "project",
        Some(project.id),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectRequest>,
) -> Result<Json<Project>, AppError> {
    auth.require_developer()?;
    let input = req.validate()?;
    ensure_category(&state, input.category_id).await?;

    let Some(project) = db::projects::update(&state.pool, id, auth.user_id, &input).await? else {
        return Err(explain_locked(&state, id, auth.user_id, "edited").await);
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.updated",
        "project",
        Some(id),
        None,
    )
    .await;

    Ok(Json(project))
}

/// Send a draft or rejected listing to the moderation queue.
pub async fn submit(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    auth.require_developer()?;

    let Some(project) = db::projects::submit(&state.pool, id, auth.user_id).await? else {
        return Err(explain_locked(&state, id, auth.user_id, "submitted").await);
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.submitted",
        "project",
        Some(id),
        None,
    )
    .await;

    Ok(Json(project))
}

async fn ensure_category(state: &SharedState, category_id: Uuid) -> Result<(), AppError> {
    db::categories::find_by_id(&state.pool, category_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest("Unknown category".to_string()))
}

/// Why a guarded update on a developer's project matched no row.
async fn explain_locked(state: &SharedState, id: Uuid, developer_id: Uuid, verb: &str) -> AppError {
    match db::projects::find_by_id(&state.pool, id).await {
        Ok(Some(project)) if project.developer_id == developer_id => AppError::Conflict(format!(
            "Only draft or rejected projects can be {verb} (current status: {})",
            project.status
        )),
        Ok(_) => AppError::NotFound("Project not found".to_string()),
        Err(e) => AppError::Database(e),
    }
}

/// Load a project and check that `developer_id` owns it.
pub(crate) async fn owned_project(
    state: &SharedState,
    id: Uuid,
    developer_id: Uuid,
) -> Result<Project, AppError> {
    db::projects::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.developer_id == developer_id)
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}
