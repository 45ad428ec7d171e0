use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pdf_attachment;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::metadata::ClientInfo;
use crate::middleware::audit;
use crate::models::{Nda, nda_expiry};
use crate::state::SharedState;

const MAX_SIGNATURE_LEN: usize = 512 * 1024;

#[derive(Serialize)]
pub struct TemplateResponse {
    pub template: String,
    pub version: &'static str,
    pub document_hash: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub signed: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Deserialize)]
pub struct SignRequest {
    pub signature_data: String,
    pub signed_name: String,
    #[serde(default)]
    pub agreed: bool,
}

#[derive(Serialize)]
pub struct SignResponse {
    pub message: String,
    pub nda: Nda,
}

pub async fn template(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<TemplateResponse>, AppError> {
    auth.require_investor()?;
    Ok(Json(TemplateResponse {
        template: state.documents.nda_text().to_string(),
        version: state.documents.nda_version(),
        document_hash: state.documents.nda_hash().to_string(),
    }))
}

pub async fn status(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<StatusResponse>, AppError> {
    auth.require_investor()?;
    let latest = db::ndas::latest_for_investor(&state.pool, auth.user_id).await?;
    Ok(Json(match latest {
        Some(nda) => StatusResponse {
            signed: true,
            valid: nda.is_valid(),
            signed_at: Some(nda.signed_at),
            expires_at: Some(nda.expires_at),
            version: Some(nda.version),
        },
        None => StatusResponse {
            signed: false,
            valid: false,
            signed_at: None,
            expires_at: None,
            version: None,
        },
    }))
}

/// Sign the current NDA. Refused while an unexpired one is on file.
pub async fn sign(
    auth: AuthUser,
    client: ClientInfo,
    State(state): State<SharedState>,
    Json(req): Json<SignRequest>,
) -> Result<(StatusCode, Json<SignResponse>), AppError> {
    auth.require_investor()?;

    if !req.agreed {
        return Err(AppError::BadRequest(
            "You must agree to the NDA terms".to_string(),
        ));
    }
    let signature = req.signature_data.trim();
    let signed_name = req.signed_name.trim();
    if signature.is_empty() || signed_name.is_empty() {
        return Err(AppError::BadRequest(
            "Signature and signed name are required".to_string(),
        ));
    }
    if signature.len() > MAX_SIGNATURE_LEN {
        return Err(AppError::BadRequest("Signature is too large".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    if !db::users::lock(&mut *tx, auth.user_id).await? {
        return Err(AppError::Unauthorized("User not found".to_string()));
    }
    if let Some(existing) = db::ndas::latest_for_investor(&mut *tx, auth.user_id).await? {
        if existing.is_valid() {
            return Err(AppError::Conflict(
                "You have already signed a valid NDA".to_string(),
            ));
        }
    }

    let signed_at = Utc::now();
    let mut nda = db::ndas::create(
        &mut *tx,
        &db::ndas::NewNda {
            investor_id: auth.user_id,
            signature_data: signature,
            signed_name,
            ip_address: &client.ip,
            user_agent: &client.user_agent,
            signed_at,
            expires_at: nda_expiry(signed_at),
            version: state.documents.nda_version(),
            document_hash: state.documents.nda_hash(),
        },
    )
    .await?;
    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "nda.signed",
        "nda",
        Some(nda.id),
        Some(serde_json::json!({ "version": nda.version, "ip": nda.ip_address })),
    )
    .await;

    // The signature row is authoritative; the archived PDF is a convenience.
    if let Some(investor) = db::users::find_by_id(&state.pool, auth.user_id).await? {
        match state.documents.nda_pdf(&nda, &investor).await {
            Ok(bytes) => match state.documents.archive_nda(&nda, &bytes).await {
                Ok(path) => match db::ndas::set_document_path(&state.pool, nda.id, &path).await {
                    Ok(()) => nda.document_path = Some(path),
                    Err(e) => tracing::error!(nda_id = %nda.id, "Failed to record NDA document: {e}"),
                },
                Err(e) => tracing::error!(nda_id = %nda.id, "Failed to archive NDA: {e}"),
            },
            Err(e) => tracing::error!(nda_id = %nda.id, "Failed to render NDA: {e}"),
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(SignResponse {
            message: "NDA signed successfully".to_string(),
            nda,
        }),
    ))
}

/// Render the investor's most recent NDA.
pub async fn download(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    auth.require_investor()?;
    let nda = db::ndas::latest_for_investor(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No signed NDA found".to_string()))?;
    let investor = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let bytes = state
        .documents
        .nda_pdf(&nda, &investor)
        .await
        .map_err(AppError::Internal)?;
    Ok(pdf_attachment(
        bytes,
        &format!("nda_{}.pdf", nda.signed_at.format("%Y%m%d")),
    ))
}
