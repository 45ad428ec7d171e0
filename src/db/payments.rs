use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Payment, PaymentListing};

pub struct NewPayment<'a> {
    pub investor_id: Uuid,
    pub amount: i64,
    pub currency: &'a str,
    pub projects_total: i32,
    pub description: &'a str,
}

pub async fn create_pending<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewPayment<'_>,
) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (investor_id, amount, currency, status, projects_remaining,
                               projects_total, description)
         VALUES ($1, $2, $3, 'pending', $4, $4, $5) RETURNING *",
    )
    .bind(new.investor_id)
    .bind(new.amount)
    .bind(new.currency)
    .bind(new.projects_total)
    .bind(new.description)
    .fetch_one(executor)
    .await
}

pub async fn set_gateway_id(pool: &PgPool, id: Uuid, gateway_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payments SET gateway_payment_id = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(gateway_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM payments WHERE id = $1 AND status = 'pending'")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_for_investor(
    pool: &PgPool,
    id: Uuid,
    investor_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 AND investor_id = $2")
        .bind(id)
        .bind(investor_id)
        .fetch_optional(pool)
        .await
}

/// Lock one of the investor's payments for a status transition.
pub async fn lock_for_investor<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    investor_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE id = $1 AND investor_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(investor_id)
    .fetch_optional(executor)
    .await
}

pub async fn complete<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    receipt_url: Option<&str>,
) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "UPDATE payments SET status = 'completed', receipt_url = $2, completed_at = now(),
                             updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(receipt_url)
    .fetch_one(executor)
    .await
}

pub async fn mark_failed<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "UPDATE payments SET status = 'failed', updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// The investor's newest completed bundle with credits left.
pub async fn find_active<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    investor_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments
         WHERE investor_id = $1 AND status = 'completed' AND projects_remaining > 0
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(investor_id)
    .fetch_optional(executor)
    .await
}

/// Same as [`find_active`] but holds a row lock until the transaction ends.
pub async fn lock_active<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    investor_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments
         WHERE investor_id = $1 AND status = 'completed' AND projects_remaining > 0
         ORDER BY created_at DESC LIMIT 1
         FOR UPDATE",
    )
    .bind(investor_id)
    .fetch_optional(executor)
    .await
}

pub async fn has_completed<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    investor_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM payments WHERE investor_id = $1 AND status = 'completed')",
    )
    .bind(investor_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Spend one credit. Returns false if the bundle was already empty.
pub async fn consume_credit<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET projects_remaining = projects_remaining - 1, updated_at = now()
         WHERE id = $1 AND status = 'completed' AND projects_remaining > 0",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_for_investor(
    pool: &PgPool,
    investor_id: Uuid,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE investor_id = $1 ORDER BY created_at DESC",
    )
    .bind(investor_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<PaymentListing>, sqlx::Error> {
    sqlx::query_as::<_, PaymentListing>(
        "SELECT pay.*, u.email AS investor_email,
                (u.first_name || ' ' || u.last_name) AS investor_name
         FROM payments pay JOIN users u ON u.id = pay.investor_id
         ORDER BY pay.created_at DESC",
    )
    .fetch_all(pool)
    .await
}
