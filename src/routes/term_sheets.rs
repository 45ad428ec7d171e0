use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::pdf_attachment;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::documents::safe::SafeParties;
use crate::error::AppError;
use crate::metadata::ClientInfo;
use crate::middleware::audit;
use crate::models::{SigningParty, TermSheet, TermSheetListing, TermSheetStatus};
use crate::state::SharedState;

/// Upper bound on stored signature payloads (typed names or data-URL images).
const MAX_SIGNATURE_LEN: usize = 512 * 1024;

#[derive(Deserialize)]
pub struct SignRequest {
    pub signature_data: String,
}

fn party_of(sheet: &TermSheetListing, user_id: Uuid) -> Option<SigningParty> {
    if sheet.investor_id == user_id {
        Some(SigningParty::Investor)
    } else if sheet.developer_id == user_id {
        Some(SigningParty::Developer)
    } else {
        None
    }
}

async fn visible_sheet(
    state: &SharedState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<TermSheetListing, AppError> {
    db::term_sheets::find_listing(&state.pool, id)
        .await?
        .filter(|t| auth.is_admin() || party_of(t, auth.user_id).is_some())
        .ok_or_else(|| AppError::NotFound("Term sheet not found".to_string()))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<TermSheetListing>>, AppError> {
    let sheets = if auth.is_admin() {
        db::term_sheets::list_all(&state.pool).await?
    } else {
        db::term_sheets::list_for_party(&state.pool, auth.user_id).await?
    };
    Ok(Json(sheets))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TermSheetListing>, AppError> {
    Ok(Json(visible_sheet(&state, &auth, id).await?))
}

/// Render the SAFE as it currently stands.
pub async fn download(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let listing = visible_sheet(&state, &auth, id).await?;
    let bytes = render_safe(&state, &listing).await?;
    Ok(pdf_attachment(
        bytes,
        &format!("safe_{}.pdf", &listing.term_sheet.id.simple().to_string()[..8]),
    ))
}

async fn render_safe(state: &SharedState, listing: &TermSheetListing) -> Result<Vec<u8>, AppError> {
    let missing = || AppError::Internal(format!("Term sheet {} has a dangling party", listing.term_sheet.id));
    let developer = db::users::find_by_id(&state.pool, listing.developer_id)
        .await?
        .ok_or_else(missing)?;
    let investor = db::users::find_by_id(&state.pool, listing.investor_id)
        .await?
        .ok_or_else(missing)?;

    let parties = SafeParties::new(&developer, &investor, &listing.project_title);
    state
        .documents
        .safe_pdf(&listing.term_sheet, parties)
        .await
        .map_err(AppError::Internal)
}

/// Add the caller's signature. Parties may sign in either order; the second
/// signature completes the sheet and archives the executed SAFE.
pub async fn sign(
    auth: AuthUser,
    client: ClientInfo,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SignRequest>,
) -> Result<Json<TermSheet>, AppError> {
    let signature = req.signature_data.trim();
    if signature.is_empty() {
        return Err(AppError::BadRequest("Signature is required".to_string()));
    }
    if signature.len() > MAX_SIGNATURE_LEN {
        return Err(AppError::BadRequest("Signature is too large".to_string()));
    }

    let mut tx = state.pool.begin().await?;

    let listing = db::term_sheets::find_listing(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Term sheet not found".to_string()))?;
    let party = party_of(&listing, auth.user_id).ok_or_else(|| {
        AppError::Forbidden("You are not a party to this term sheet".to_string())
    })?;

    let sheet = db::term_sheets::lock(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Term sheet not found".to_string()))?;

    if sheet.status == TermSheetStatus::Voided.as_str() {
        return Err(AppError::Conflict("This term sheet has been voided".to_string()));
    }
    if sheet.signed_by(party) {
        return Err(AppError::Conflict(
            "You have already signed this term sheet".to_string(),
        ));
    }

    let status = TermSheetStatus::from_signatures(
        party == SigningParty::Investor || sheet.signed_by(SigningParty::Investor),
        party == SigningParty::Developer || sheet.signed_by(SigningParty::Developer),
    );

    let mut signed = db::term_sheets::record_signature(
        &mut *tx,
        id,
        party,
        signature,
        &client.ip,
        status.as_str(),
    )
    .await?;

    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "term_sheet.signed",
        "term_sheet",
        Some(id),
        Some(serde_json::json!({ "party": party.as_str(), "status": status.as_str() })),
    )
    .await;

    let developer = db::users::find_by_id(&state.pool, listing.developer_id).await?;
    let investor = db::users::find_by_id(&state.pool, listing.investor_id).await?;
    let (Some(developer), Some(investor)) = (developer, investor) else {
        return Ok(Json(signed));
    };

    if status == TermSheetStatus::Completed {
        let parties = SafeParties::new(&developer, &investor, &listing.project_title);
        match state.documents.safe_pdf(&signed, parties).await {
            Ok(bytes) => match state.documents.archive_safe(&signed, &bytes).await {
                Ok(path) => match db::term_sheets::set_document_path(&state.pool, id, &path).await {
                    Ok(()) => signed.document_path = Some(path),
                    Err(e) => tracing::error!(term_sheet_id = %id, "Failed to record SAFE document: {e}"),
                },
                Err(e) => tracing::error!(term_sheet_id = %id, "Failed to archive SAFE: {e}"),
            },
            Err(e) => tracing::error!(term_sheet_id = %id, "Failed to render SAFE: {e}"),
        }

        for party in [&investor, &developer] {
            state
                .notifier
                .term_sheet_completed(&party.email, &party.full_name(), &listing.project_title);
        }
    } else {
        let (counterparty, signer) = match party {
            SigningParty::Investor => (&developer, "investor"),
            SigningParty::Developer => (&investor, "developer"),
        };
        state.notifier.term_sheet_signed(
            &counterparty.email,
            &counterparty.full_name(),
            &listing.project_title,
            signer,
        );
    }

    Ok(Json(signed))
}
