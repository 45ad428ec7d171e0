use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Nda;

pub struct NewNda<'a> {
    pub investor_id: Uuid,
    pub signature_data: &'a str,
    pub signed_name: &'a str,
    pub ip_address: &'a str,
    pub user_agent: &'a str,
    pub signed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub version: &'a str,
    pub document_hash: &'a str,
}

/// Most recent signing event for an investor.
pub async fn latest_for_investor<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    investor_id: Uuid,
) -> Result<Option<Nda>, sqlx::Error> {
    sqlx::query_as::<_, Nda>(
        "SELECT * FROM ndas WHERE investor_id = $1 ORDER BY signed_at DESC LIMIT 1",
    )
    .bind(investor_id)
    .fetch_optional(executor)
    .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewNda<'_>,
) -> Result<Nda, sqlx::Error> {
    sqlx::query_as::<_, Nda>(
        "INSERT INTO ndas (investor_id, signature_data, signed_name, ip_address, user_agent,
                           signed_at, expires_at, version, document_hash)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(new.investor_id)
    .bind(new.signature_data)
    .bind(new.signed_name)
    .bind(new.ip_address)
    .bind(new.user_agent)
    .bind(new.signed_at)
    .bind(new.expires_at)
    .bind(new.version)
    .bind(new.document_hash)
    .fetch_one(executor)
    .await
}

pub async fn set_document_path(pool: &PgPool, id: Uuid, path: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ndas SET document_path = $2 WHERE id = $1")
        .bind(id)
        .bind(path)
        .execute(pool)
        .await?;
    Ok(())
}
