use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{SigningParty, TermSheet, TermSheetListing};

const LISTING_SELECT: &str = "SELECT t.*, o.project_id, p.title AS project_title,
        o.investor_id, p.developer_id
     FROM term_sheets t
     JOIN investment_offers o ON o.id = t.offer_id
     JOIN projects p ON p.id = o.project_id";

pub struct NewTermSheet {
    pub offer_id: Uuid,
    pub investment_amount: f64,
    pub valuation_cap: f64,
    pub discount_rate: f64,
    pub pro_rata_rights: bool,
    pub mfn_clause: bool,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewTermSheet,
) -> Result<TermSheet, sqlx::Error> {
    sqlx::query_as::<_, TermSheet>(
        "INSERT INTO term_sheets (offer_id, investment_amount, valuation_cap, discount_rate,
                                  pro_rata_rights, mfn_clause, status)
         VALUES ($1, $2, $3, $4, $5, $6, 'draft') RETURNING *",
    )
    .bind(new.offer_id)
    .bind(new.investment_amount)
    .bind(new.valuation_cap)
    .bind(new.discount_rate)
    .bind(new.pro_rata_rights)
    .bind(new.mfn_clause)
    .fetch_one(executor)
    .await
}

pub async fn find_listing<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<TermSheetListing>, sqlx::Error> {
    sqlx::query_as::<_, TermSheetListing>(&format!("{LISTING_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn lock<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<TermSheet>, sqlx::Error> {
    sqlx::query_as::<_, TermSheet>("SELECT * FROM term_sheets WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Store one party's signature together with the status it implies.
pub async fn record_signature<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    party: SigningParty,
    signature: &str,
    ip: &str,
    status: &str,
) -> Result<TermSheet, sqlx::Error> {
    let sql = match party {
        SigningParty::Investor => {
            "UPDATE term_sheets SET investor_signature = $2, investor_signed_at = now(),
                 investor_ip = $3, status = $4, updated_at = now()
             WHERE id = $1 RETURNING *"
        }
        SigningParty::Developer => {
            "UPDATE term_sheets SET developer_signature = $2, developer_signed_at = now(),
                 developer_ip = $3, status = $4, updated_at = now()
             WHERE id = $1 RETURNING *"
        }
    };

    sqlx::query_as::<_, TermSheet>(sql)
        .bind(id)
        .bind(signature)
        .bind(ip)
        .bind(status)
        .fetch_one(executor)
        .await
}

pub async fn set_document_path(pool: &PgPool, id: Uuid, path: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE term_sheets SET document_path = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(path)
        .execute(pool)
        .await?;
    Ok(())
}

/// Sheets where the user is either the investor or the project's developer.
pub async fn list_for_party(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<TermSheetListing>, sqlx::Error> {
    sqlx::query_as::<_, TermSheetListing>(&format!(
        "{LISTING_SELECT} WHERE o.investor_id = $1 OR p.developer_id = $1
         ORDER BY t.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<TermSheetListing>, sqlx::Error> {
    sqlx::query_as::<_, TermSheetListing>(&format!("{LISTING_SELECT} ORDER BY t.created_at DESC"))
        .fetch_all(pool)
        .await
}

/// Void a sheet that has not been completed. Returns `None` otherwise.
pub async fn void(pool: &PgPool, id: Uuid) -> Result<Option<TermSheet>, sqlx::Error> {
    sqlx::query_as::<_, TermSheet>(
        "UPDATE term_sheets SET status = 'voided', updated_at = now()
         WHERE id = $1 AND status NOT IN ('completed', 'voided')
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
