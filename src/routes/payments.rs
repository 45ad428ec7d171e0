use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Payment, PaymentStatus, ViewedProject};
use crate::payments::{IntentRequest, IntentStatus};
use crate::state::SharedState;

/// Client secret handed out when no gateway is configured.
pub const DEMO_CLIENT_SECRET: &str = "demo_mode";

#[derive(Serialize)]
pub struct IntentResponse {
    pub payment_id: Uuid,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub projects: i32,
    pub demo_mode: bool,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub payment_id: Uuid,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub message: String,
    pub payment: Payment,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub has_active_payment: bool,
    pub projects_remaining: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_total: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub payments: Vec<Payment>,
}

#[derive(Serialize)]
pub struct ViewedResponse {
    pub views: Vec<ViewedProject>,
}

/// Start buying a bundle of project views. Runs behind the NDA layer.
pub async fn create_intent(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<IntentResponse>), AppError> {
    auth.require_investor()?;
    let fee = &state.config.payment;
    let description = format!(
        "Project viewing fee - access to view up to {} projects",
        fee.max_project_views
    );

    let mut tx = state.pool.begin().await?;
    db::users::lock(&mut *tx, auth.user_id).await?;
    if db::payments::find_active(&mut *tx, auth.user_id).await?.is_some() {
        return Err(AppError::Conflict(
            "You already have an active payment with remaining project views".to_string(),
        ));
    }
    let payment = db::payments::create_pending(
        &mut *tx,
        &db::payments::NewPayment {
            investor_id: auth.user_id,
            amount: fee.view_fee_amount,
            currency: &fee.view_fee_currency,
            projects_total: fee.max_project_views,
            description: &description,
        },
    )
    .await?;
    tx.commit().await?;

    let client_secret = match &state.gateway {
        None => DEMO_CLIENT_SECRET.to_string(),
        Some(gateway) => {
            let request = IntentRequest {
                payment_id: payment.id,
                investor_id: auth.user_id,
                amount: payment.amount,
                currency: &payment.currency,
                description: &payment.description,
            };
            let intent = match gateway.create_intent(&request).await {
                Ok(intent) => intent,
                Err(e) => {
                    tracing::error!(payment_id = %payment.id, gateway = gateway.name(), "Payment intent failed: {e}");
                    db::payments::delete(&state.pool, payment.id).await?;
                    return Err(AppError::Internal(format!("Payment gateway error: {e}")));
                }
            };
            db::payments::set_gateway_id(&state.pool, payment.id, &intent.id).await?;
            intent.client_secret.unwrap_or_default()
        }
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "payment.created",
        "payment",
        Some(payment.id),
        Some(serde_json::json!({ "amount": payment.amount, "currency": payment.currency })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(IntentResponse {
            payment_id: payment.id,
            client_secret,
            amount: payment.amount,
            currency: payment.currency,
            projects: payment.projects_total,
            demo_mode: state.gateway.is_none(),
        }),
    ))
}

/// Settle a pending payment. Without a gateway the payment completes
/// immediately; with one, the intent's status decides.
pub async fn confirm(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, AppError> {
    auth.require_investor()?;

    let found = db::payments::find_for_investor(&state.pool, req.payment_id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
    if found.status != PaymentStatus::Pending.as_str() {
        return Err(AppError::Conflict("Payment already processed".to_string()));
    }

    // The gateway is queried before any row lock is taken.
    let intent = match &state.gateway {
        None => None,
        Some(gateway) => {
            let intent_id = found.gateway_payment_id.as_deref().ok_or_else(|| {
                AppError::BadRequest("Payment has no gateway intent".to_string())
            })?;
            let intent = gateway
                .retrieve_intent(intent_id)
                .await
                .map_err(|e| AppError::Internal(format!("Payment gateway error: {e}")))?;
            Some(intent)
        }
    };

    let mut tx = state.pool.begin().await?;
    let payment = db::payments::lock_for_investor(&mut *tx, found.id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
    if payment.status != PaymentStatus::Pending.as_str() {
        return Err(AppError::Conflict("Payment already processed".to_string()));
    }

    let payment = match intent {
        None => db::payments::complete(&mut *tx, payment.id, None).await?,
        Some(intent) => match intent.status {
            IntentStatus::Succeeded => {
                db::payments::complete(&mut *tx, payment.id, intent.receipt_url.as_deref()).await?
            }
            IntentStatus::Canceled => {
                let failed = db::payments::mark_failed(&mut *tx, payment.id).await?;
                tx.commit().await?;
                tracing::info!(payment_id = %failed.id, "Payment intent was canceled");
                return Err(AppError::BadRequest("Payment was canceled".to_string()));
            }
            other => {
                return Err(AppError::BadRequest(format!(
                    "Payment not successful (status: {other:?})"
                )));
            }
        },
    };
    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "payment.completed",
        "payment",
        Some(payment.id),
        None,
    )
    .await;

    Ok(Json(ConfirmResponse {
        message: "Payment confirmed successfully".to_string(),
        payment,
    }))
}

pub async fn status(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<StatusResponse>, AppError> {
    auth.require_investor()?;
    let active = db::payments::find_active(&state.pool, auth.user_id).await?;
    Ok(Json(match active {
        Some(payment) => StatusResponse {
            has_active_payment: payment.is_active(),
            projects_remaining: payment.projects_remaining,
            projects_total: Some(payment.projects_total),
            payment: Some(payment),
        },
        None => StatusResponse {
            has_active_payment: false,
            projects_remaining: 0,
            projects_total: None,
            payment: None,
        },
    }))
}

pub async fn history(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<HistoryResponse>, AppError> {
    auth.require_investor()?;
    let payments = db::payments::list_for_investor(&state.pool, auth.user_id).await?;
    Ok(Json(HistoryResponse { payments }))
}

pub async fn viewed(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<ViewedResponse>, AppError> {
    auth.require_investor()?;
    let views = db::project_views::list_for_investor(&state.pool, auth.user_id).await?;
    Ok(Json(ViewedResponse { views }))
}
