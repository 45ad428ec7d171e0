use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::{AppError, is_unique_violation};
use crate::middleware::access_gate;
use crate::middleware::audit;
use crate::models::{
    DEFAULT_DISCOUNT_RATE, InvestmentOffer, OFFER_VALIDITY_DAYS, OfferListing, OfferStatus,
    ProjectStatus, Role, TermSheet,
};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateOfferRequest {
    pub project_id: Uuid,
    pub offer_amount: f64,
    #[serde(default)]
    pub equity_requested: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub action: String,
    pub response_notes: Option<String>,
    pub valuation_cap: Option<f64>,
    pub discount_rate: Option<f64>,
    pub pro_rata_rights: Option<bool>,
    pub mfn_clause: Option<bool>,
}

#[derive(Serialize)]
pub struct RespondResponse {
    pub message: String,
    pub offer: InvestmentOffer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_sheet: Option<TermSheet>,
}

/// Submit an offer. Investors pass the NDA layer first, and an offer on a
/// project they never unlocked spends a view credit like opening it would.
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<InvestmentOffer>), AppError> {
    auth.require_investor()?;

    let project = db::projects::find_by_id(&state.pool, req.project_id)
        .await?
        .filter(|p| p.status() == Some(ProjectStatus::Approved))
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    if !req.offer_amount.is_finite() || req.offer_amount <= 0.0 {
        return Err(AppError::BadRequest(
            "Offer amount must be greater than zero".to_string(),
        ));
    }
    if req.offer_amount < project.min_investment {
        return Err(AppError::BadRequest(format!(
            "Offer amount must be at least the minimum investment of {}",
            project.min_investment
        )));
    }
    if !(0.0..=100.0).contains(&req.equity_requested) {
        return Err(AppError::BadRequest(
            "Requested equity must be between 0 and 100 percent".to_string(),
        ));
    }

    db::offers::expire_due(&state.pool).await?;
    access_gate::unlock_project(&state.pool, auth.user_id, project.id).await?;

    let offer = db::offers::create(
        &state.pool,
        &db::offers::NewOffer {
            investor_id: auth.user_id,
            project_id: project.id,
            offer_amount: req.offer_amount,
            equity_requested: req.equity_requested,
            notes: req.notes.trim(),
            expires_at: Utc::now() + Duration::days(OFFER_VALIDITY_DAYS),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You already have a pending offer on this project".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "offer.created",
        "offer",
        Some(offer.id),
        Some(serde_json::json!({ "project_id": project.id, "amount": offer.offer_amount })),
    )
    .await;

    let investor = db::users::find_by_id(&state.pool, auth.user_id).await?;
    let developer = db::users::find_by_id(&state.pool, project.developer_id).await?;
    if let (Some(investor), Some(developer)) = (investor, developer) {
        state.notifier.offer_received(
            &developer.email,
            &developer.full_name(),
            &investor.full_name(),
            &project.title,
            offer.offer_amount,
        );
    }

    Ok((StatusCode::CREATED, Json(offer)))
}

/// Offers visible to the caller: their own as investor, those on their
/// projects as developer, everything for admins.
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<OfferListing>>, AppError> {
    db::offers::expire_due(&state.pool).await?;
    let offers = match auth.role {
        Role::Investor => db::offers::list_for_investor(&state.pool, auth.user_id).await?,
        Role::Developer => db::offers::list_for_developer(&state.pool, auth.user_id).await?,
        Role::Admin => db::offers::list_all(&state.pool, None).await?,
    };
    Ok(Json(offers))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferListing>, AppError> {
    db::offers::expire_due(&state.pool).await?;
    let offer = db::offers::find_listing(&state.pool, id)
        .await?
        .filter(|o| {
            auth.is_admin() || o.offer.investor_id == auth.user_id || o.developer_id == auth.user_id
        })
        .ok_or_else(|| AppError::NotFound("Offer not found".to_string()))?;
    Ok(Json(offer))
}

/// Accept or reject a pending offer. Acceptance creates the draft term sheet
/// in the same transaction.
pub async fn respond(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<RespondResponse>, AppError> {
    auth.require_developer()?;

    let accepted = match req.action.as_str() {
        "accept" => true,
        "reject" => false,
        _ => {
            return Err(AppError::BadRequest(
                "Action must be accept or reject".to_string(),
            ));
        }
    };
    if let Some(rate) = req.discount_rate {
        if !(0.0..100.0).contains(&rate) {
            return Err(AppError::BadRequest(
                "Discount rate must be between 0 and 100 percent".to_string(),
            ));
        }
    }
    if req.valuation_cap.is_some_and(|cap| !cap.is_finite() || cap < 0.0) {
        return Err(AppError::BadRequest(
            "Valuation cap cannot be negative".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    db::offers::expire_due(&mut *tx).await?;

    let offer = db::offers::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Offer not found".to_string()))?;
    let project = db::projects::find_by_id(&mut *tx, offer.project_id)
        .await?
        .filter(|p| p.developer_id == auth.user_id)
        .ok_or_else(|| AppError::NotFound("Offer not found".to_string()))?;

    let status = if accepted {
        OfferStatus::Accepted
    } else {
        OfferStatus::Rejected
    };
    let notes = req
        .response_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let Some(offer) = db::offers::respond(&mut *tx, id, status.as_str(), notes).await? else {
        let message = if offer.status == OfferStatus::Expired.as_str() || offer.expires_at <= Utc::now() {
            "This offer has expired".to_string()
        } else {
            format!("This offer has already been {}", offer.status)
        };
        return Err(AppError::Conflict(message));
    };

    let term_sheet = if accepted {
        let valuation_cap = req
            .valuation_cap
            .filter(|cap| *cap > 0.0)
            .unwrap_or(project.valuation_cap);
        let discount_rate = req
            .discount_rate
            .filter(|rate| *rate > 0.0)
            .unwrap_or(DEFAULT_DISCOUNT_RATE);
        Some(
            db::term_sheets::create(
                &mut *tx,
                &db::term_sheets::NewTermSheet {
                    offer_id: offer.id,
                    investment_amount: offer.offer_amount,
                    valuation_cap,
                    discount_rate,
                    pro_rata_rights: req.pro_rata_rights.unwrap_or(true),
                    mfn_clause: req.mfn_clause.unwrap_or(false),
                },
            )
            .await?,
        )
    } else {
        None
    };

    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        if accepted { "offer.accepted" } else { "offer.rejected" },
        "offer",
        Some(offer.id),
        term_sheet
            .as_ref()
            .map(|t| serde_json::json!({ "term_sheet_id": t.id })),
    )
    .await;

    if let Some(investor) = db::users::find_by_id(&state.pool, offer.investor_id).await? {
        state.notifier.offer_response(
            &investor.email,
            &investor.full_name(),
            &project.title,
            accepted,
            offer.response_notes.as_deref(),
        );
    }

    Ok(Json(RespondResponse {
        message: format!("Offer {}", status.as_str()),
        offer,
        term_sheet,
    }))
}

/// Withdraw one of the caller's pending offers.
pub async fn withdraw(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvestmentOffer>, AppError> {
    auth.require_investor()?;
    db::offers::expire_due(&state.pool).await?;

    let Some(offer) = db::offers::withdraw(&state.pool, id, auth.user_id).await? else {
        return match db::offers::find_by_id(&state.pool, id).await? {
            Some(existing) if existing.investor_id == auth.user_id => Err(AppError::Conflict(
                format!("Only pending offers can be withdrawn (current status: {})", existing.status),
            )),
            _ => Err(AppError::NotFound("Offer not found".to_string())),
        };
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "offer.withdrawn",
        "offer",
        Some(offer.id),
        None,
    )
    .await;

    Ok(Json(offer))
}
