pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod email;
pub mod error;
pub mod metadata;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod rate_limit;
pub mod routes;
pub mod seed;
pub mod state;
pub mod storage;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::documents::DocumentStore;
use crate::email::{Notifier, SystemMailer};
use crate::payments::PaymentGateway;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

pub fn build_app(
    pool: PgPool,
    config: Config,
    gateway: Option<Arc<dyn PaymentGateway>>,
) -> (Router, SharedState) {
    let mailer = config.smtp.as_ref().and_then(|smtp| match SystemMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!("System SMTP configured");
            Some(mailer)
        }
        Err(e) => {
            tracing::warn!("System SMTP not available: {e}");
            None
        }
    });

    match &gateway {
        Some(g) => tracing::info!("Payment gateway: {}", g.name()),
        None => tracing::info!("No payment gateway configured, payments run in demo mode"),
    }

    let state: SharedState = Arc::new(AppState {
        notifier: Notifier::new(mailer, &config.app_name, &config.base_url),
        documents: DocumentStore::new(&config.upload_dir, &config.app_name),
        login_limiter: LoginRateLimiter::default(),
        gateway,
        pool,
        config,
    });

    if !state.notifier.is_enabled() {
        tracing::info!("SMTP not configured, notifications will only be logged");
    }

    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(state.config.cors_origins.clone()))
            .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    };

    let app = Router::new()
        .merge(routes::api_routes(&state))
        .nest_service(
            storage::PUBLIC_PREFIX,
            ServeDir::new(storage::projects_dir(&state.config.upload_dir)),
        )
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
        .with_state(state.clone());

    (app, state)
}

/// Periodic housekeeping on a fixed interval. See [`housekeeping_pass`].
pub async fn run_housekeeping(state: SharedState, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        housekeeping_pass(&state).await;
    }
}

/// Prune the login limiter and drop expired tokens. Offers are left alone:
/// their expiry is settled when offers are next read or written.
pub async fn housekeeping_pass(state: &AppState) {
    state.login_limiter.cleanup();

    match db::refresh_tokens::delete_expired(&state.pool).await {
        Ok(n) if n > 0 => tracing::debug!("Removed {n} expired refresh tokens"),
        Ok(_) => {}
        Err(e) => tracing::warn!("Refresh token cleanup failed: {e}"),
    }
    match db::password_reset_tokens::delete_expired(&state.pool).await {
        Ok(n) if n > 0 => tracing::debug!("Removed {n} expired password reset tokens"),
        Ok(_) => {}
        Err(e) => tracing::warn!("Password reset token cleanup failed: {e}"),
    }
}

async fn health() -> &'static str {
    "ok"
}
