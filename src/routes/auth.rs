use std::sync::LazyLock;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{Claims, encode_token};
use crate::auth::{password, tokens};
use crate::db;
use crate::error::{AppError, is_unique_violation};
use crate::middleware::audit;
use crate::models::{Role, User};
use crate::state::SharedState;

const REFRESH_TOKEN_DAYS: i64 = 7;
const RESET_TOKEN_HOURS: i64 = 24;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

fn auth_cookies(access_token: &str, refresh_token: &str, access_minutes: i64) -> CookieJar {
    let access = Cookie::build(("access_token", access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(access_minutes))
        .build();

    let refresh = Cookie::build(("refresh_token", refresh_token.to_string()))
        .path("/api/v1/auth")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(REFRESH_TOKEN_DAYS))
        .build();

    CookieJar::new().add(access).add(refresh)
}

fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build(("refresh_token", ""))
        .path("/api/v1/auth")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

/// Mint an access token and a fresh refresh token for `user`.
async fn issue_session(
    state: &SharedState,
    user: User,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let minutes = state.config.access_token_minutes;
    let claims = Claims::new(user.id, &user.role, minutes);
    let access_token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    let refresh = tokens::generate();
    db::refresh_tokens::create(
        &state.pool,
        user.id,
        &tokens::hash(&refresh),
        Utc::now() + Duration::days(REFRESH_TOKEN_DAYS),
    )
    .await?;

    let jar = auth_cookies(&access_token, &refresh, minutes);
    Ok((
        jar,
        Json(AuthResponse {
            user,
            access_token,
            refresh_token: refresh,
        }),
    ))
}

fn validate_password(password: &str) -> Result<(), AppError> {
    password::check_policy(password).map_err(AppError::BadRequest)
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let email = req.email.trim();
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "First and last name are required".to_string(),
        ));
    }
    let role = match Role::parse(&req.role) {
        Some(role @ (Role::Investor | Role::Developer)) => role,
        _ => {
            return Err(AppError::BadRequest(
                "Role must be investor or developer".to_string(),
            ));
        }
    };
    validate_password(&req.password)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    let verify_token = tokens::generate();
    let verify_hash = tokens::hash(&verify_token);

    let user = db::users::create(
        &state.pool,
        &db::users::NewUser {
            email,
            password_hash: &pw_hash,
            role: role.as_str(),
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            phone: req.phone.trim(),
            company_name: req.company_name.trim(),
            email_verified: false,
            verify_token_hash: Some(&verify_hash),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("An account with this email already exists".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    state
        .notifier
        .verification(&user.email, &user.full_name(), &verify_token);

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.registered",
        "user",
        Some(user.id),
        Some(serde_json::json!({ "role": role.as_str() })),
    )
    .await;

    let (jar, body) = issue_session(&state, user).await?;
    Ok((StatusCode::CREATED, jar, body))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if let Err(wait) = state.login_limiter.check(&req.email) {
        return Err(AppError::RateLimited(format!(
            "Too many login attempts. Try again in {} minutes.",
            wait.div_ceil(60).max(1)
        )));
    }

    let Some(user) = db::users::find_by_email(&state.pool, req.email.trim()).await? else {
        state.login_limiter.record_failure(&req.email);
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&req.email);
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }
    state.login_limiter.reset(&req.email);

    audit::log_event(&state.pool, Some(user.id), "user.login", "user", Some(user.id), None).await;

    issue_session(&state, user).await
}

/// Rotate a refresh token. Presenting a token that was already rotated
/// revokes every session of its owner.
pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Option<Json<TokenRequest>>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let refresh_value = jar
        .get("refresh_token")
        .map(|c| c.value().to_string())
        .or_else(|| body.map(|Json(b)| b.token))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::find_by_hash(&state.pool, &tokens::hash(&refresh_value))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.used || !db::refresh_tokens::mark_used(&state.pool, stored.id).await? {
        tracing::warn!(user_id = %stored.user_id, "Refresh token reuse detected, revoking all sessions");
        db::refresh_tokens::delete_all_for_user(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    issue_session(&state, user).await
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get("refresh_token") {
        db::refresh_tokens::delete_by_hash(&state.pool, &tokens::hash(cookie.value())).await?;
    }

    Ok((clear_auth_cookies(), MessageResponse::new("Logged out successfully")))
}

pub async fn verify_email(
    State(state): State<SharedState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if req.token.is_empty() {
        return Err(AppError::BadRequest("Verification token required".to_string()));
    }

    let user = db::users::verify_email(&state.pool, &tokens::hash(&req.token))
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid verification token".to_string()))?;

    audit::log_event(&state.pool, Some(user.id), "user.email_verified", "user", Some(user.id), None)
        .await;

    Ok(MessageResponse::new("Email verified successfully"))
}

/// Always answers 200 so the response does not reveal which emails exist.
pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = MessageResponse::new(
        "If your email is registered, you will receive a password reset link",
    );

    let Some(user) = db::users::find_by_email(&state.pool, req.email.trim()).await? else {
        return Ok(response);
    };

    let token = tokens::generate();
    db::password_reset_tokens::create(
        &state.pool,
        user.id,
        &tokens::hash(&token),
        Utc::now() + Duration::hours(RESET_TOKEN_HOURS),
    )
    .await?;

    state
        .notifier
        .password_reset(&user.email, &user.full_name(), &token);

    Ok(response)
}

pub async fn reset_password(
    State(state): State<SharedState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_password(&req.new_password)?;

    let reset_token = db::password_reset_tokens::consume(&state.pool, &tokens::hash(&req.token))
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, reset_token.user_id, &pw_hash).await?;
    db::refresh_tokens::delete_all_for_user(&state.pool, reset_token.user_id).await?;

    audit::log_event(
        &state.pool,
        Some(reset_token.user_id),
        "user.password_reset",
        "user",
        Some(reset_token.user_id),
        None,
    )
    .await;

    Ok(MessageResponse::new("Password reset successfully"))
}

pub async fn change_password(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    validate_password(&req.new_password)?;

    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let valid =
        password::verify(&req.current_password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;
    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.password_changed",
        "user",
        Some(user.id),
        None,
    )
    .await;

    issue_session(&state, user).await
}

pub async fn me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserResponse { user }))
}

pub async fn update_profile(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let update = db::users::ProfileUpdate {
        first_name: trimmed(&req.first_name).filter(|s| !s.is_empty()),
        last_name: trimmed(&req.last_name).filter(|s| !s.is_empty()),
        phone: trimmed(&req.phone),
        company_name: trimmed(&req.company_name),
        bio: trimmed(&req.bio),
    };

    let user = db::users::update_profile(&state.pool, auth.user_id, &update).await?;
    Ok(Json(UserResponse { user }))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim)
}
