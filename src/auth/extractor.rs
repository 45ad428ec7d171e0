use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt;
use crate::error::AppError;
use crate::models::Role;
use crate::state::SharedState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_investor(&self) -> Result<(), AppError> {
        self.require(Role::Investor, "Investor access required")
    }

    pub fn require_developer(&self) -> Result<(), AppError> {
        self.require(Role::Developer, "Developer access required")
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require(Role::Admin, "Admin access required")
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn require(&self, role: Role, message: &str) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(message.to_string()))
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(parts)?
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get("access_token")
                    .map(|c| c.value().to_string())
            })
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = jwt::decode_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let role = Role::parse(&claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let user = AuthUser {
            user_id: claims.sub,
            role,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(header) = parts.headers.get("authorization") else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
    Ok(value.strip_prefix("Bearer ").map(str::to_string))
}
