use sqlx::PgPool;

use crate::auth::password;
use crate::config::AdminBootstrap;
use crate::db;
use crate::models::Role;

/// Create the configured admin account unless that email is already taken.
/// Returns true when a new account was created.
pub async fn ensure_admin(pool: &PgPool, admin: &AdminBootstrap) -> Result<bool, String> {
    let existing = db::users::find_by_email(pool, &admin.email)
        .await
        .map_err(|e| format!("Admin lookup failed: {e}"))?;
    if let Some(user) = existing {
        if user.role() != Some(Role::Admin) {
            tracing::warn!(email = %user.email, "Bootstrap admin email belongs to a non-admin account");
        }
        return Ok(false);
    }

    password::check_policy(&admin.password)?;
    let password_hash = password::hash(&admin.password)?;

    db::users::create(
        pool,
        &db::users::NewUser {
            email: &admin.email,
            password_hash: &password_hash,
            role: Role::Admin.as_str(),
            first_name: "Platform",
            last_name: "Admin",
            phone: "",
            company_name: "",
            email_verified: true,
            verify_token_hash: None,
        },
    )
    .await
    .map_err(|e| format!("Failed to create admin: {e}"))?;

    tracing::info!(email = %admin.email, "Bootstrap admin created");
    Ok(true)
}
