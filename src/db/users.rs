use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub company_name: &'a str,
    pub email_verified: bool,
    pub verify_token_hash: Option<&'a str>,
}

/// Optional profile fields; `None` leaves the column untouched.
#[derive(Default)]
pub struct ProfileUpdate<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub company_name: Option<&'a str>,
    pub bio: Option<&'a str>,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    new: &NewUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, role, first_name, last_name, phone,
                            company_name, email_verified, verify_token_hash)
         VALUES (lower($1), $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.role)
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.phone)
    .bind(new.company_name)
    .bind(new.email_verified)
    .bind(new.verify_token_hash)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list(pool: &PgPool, role: Option<&str>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE ($1::text IS NULL OR role = $1) ORDER BY created_at DESC",
    )
    .bind(role)
    .fetch_all(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone = COALESCE($4, phone),
            company_name = COALESCE($5, company_name),
            bio = COALESCE($6, bio),
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(update.first_name)
    .bind(update.last_name)
    .bind(update.phone)
    .bind(update.company_name)
    .bind(update.bio)
    .fetch_one(pool)
    .await
}

/// Consume a verification token. Returns the verified user, or `None` if the
/// token matches nobody.
pub async fn verify_email(pool: &PgPool, token_hash: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET email_verified = true, verify_token_hash = NULL, updated_at = now()
         WHERE verify_token_hash = $1 RETURNING *",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Take a row lock on the user for the rest of the transaction. Serializes
/// per-user operations such as NDA signing and bundle purchase.
pub async fn lock<'e, E: sqlx::PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.is_some())
}
