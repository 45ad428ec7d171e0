use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{InvestmentOffer, OfferListing};

const LISTING_SELECT: &str = "SELECT o.*, p.title AS project_title, p.developer_id,
        (u.first_name || ' ' || u.last_name) AS investor_name, u.email AS investor_email
     FROM investment_offers o
     JOIN projects p ON p.id = o.project_id
     JOIN users u ON u.id = o.investor_id";

pub struct NewOffer<'a> {
    pub investor_id: Uuid,
    pub project_id: Uuid,
    pub offer_amount: f64,
    pub equity_requested: f64,
    pub notes: &'a str,
    pub expires_at: DateTime<Utc>,
}

/// Lapse every pending offer whose deadline has passed. Offers are never
/// swept in the background; callers run this before reading or writing.
pub async fn expire_due<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE investment_offers SET status = 'expired', updated_at = now()
         WHERE status = 'pending' AND expires_at <= now()",
    )
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewOffer<'_>,
) -> Result<InvestmentOffer, sqlx::Error> {
    sqlx::query_as::<_, InvestmentOffer>(
        "INSERT INTO investment_offers (investor_id, project_id, offer_amount, equity_requested,
                                        notes, expires_at)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(new.investor_id)
    .bind(new.project_id)
    .bind(new.offer_amount)
    .bind(new.equity_requested)
    .bind(new.notes)
    .bind(new.expires_at)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<InvestmentOffer>, sqlx::Error> {
    sqlx::query_as::<_, InvestmentOffer>("SELECT * FROM investment_offers WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_listing(pool: &PgPool, id: Uuid) -> Result<Option<OfferListing>, sqlx::Error> {
    sqlx::query_as::<_, OfferListing>(&format!("{LISTING_SELECT} WHERE o.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_investor(
    pool: &PgPool,
    investor_id: Uuid,
) -> Result<Vec<OfferListing>, sqlx::Error> {
    sqlx::query_as::<_, OfferListing>(&format!(
        "{LISTING_SELECT} WHERE o.investor_id = $1 ORDER BY o.created_at DESC"
    ))
    .bind(investor_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_developer(
    pool: &PgPool,
    developer_id: Uuid,
) -> Result<Vec<OfferListing>, sqlx::Error> {
    sqlx::query_as::<_, OfferListing>(&format!(
        "{LISTING_SELECT} WHERE p.developer_id = $1 ORDER BY o.created_at DESC"
    ))
    .bind(developer_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &PgPool, status: Option<&str>) -> Result<Vec<OfferListing>, sqlx::Error> {
    sqlx::query_as::<_, OfferListing>(&format!(
        "{LISTING_SELECT} WHERE ($1::text IS NULL OR o.status = $1) ORDER BY o.created_at DESC"
    ))
    .bind(status)
    .fetch_all(pool)
    .await
}

/// Settle an open offer. Returns `None` if it was already settled or has
/// expired, so at most one response ever succeeds.
pub async fn respond<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    status: &str,
    response_notes: Option<&str>,
) -> Result<Option<InvestmentOffer>, sqlx::Error> {
    sqlx::query_as::<_, InvestmentOffer>(
        "UPDATE investment_offers
         SET status = $2, response_notes = $3, responded_at = now(), updated_at = now()
         WHERE id = $1 AND status = 'pending' AND expires_at > now()
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(response_notes)
    .fetch_optional(executor)
    .await
}

pub async fn withdraw(
    pool: &PgPool,
    id: Uuid,
    investor_id: Uuid,
) -> Result<Option<InvestmentOffer>, sqlx::Error> {
    sqlx::query_as::<_, InvestmentOffer>(
        "UPDATE investment_offers SET status = 'withdrawn', updated_at = now()
         WHERE id = $1 AND investor_id = $2 AND status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .bind(investor_id)
    .fetch_optional(pool)
    .await
}
