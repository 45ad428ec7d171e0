pub mod admin;
pub mod auth;
pub mod categories;
pub mod developer;
pub mod images;
pub mod nda;
pub mod offers;
pub mod payments;
pub mod projects;
pub mod term_sheets;

use axum::handler::Handler;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::middleware::access_gate;
use crate::state::SharedState;

pub fn api_routes(state: &SharedState) -> Router<SharedState> {
    let nda_gate = axum::middleware::from_fn_with_state(state.clone(), access_gate::require_nda);

    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/verify-email", post(auth::verify_email))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/profile", put(auth::update_profile))
        // Catalog
        .route("/api/v1/categories", get(categories::list))
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get.layer(nda_gate.clone())).put(projects::update),
        )
        .route("/api/v1/projects/{id}/submit", post(projects::submit))
        .route("/api/v1/projects/{id}/images", post(images::upload))
        .route(
            "/api/v1/projects/{id}/images/{image_id}",
            delete(images::delete),
        )
        // Developer dashboard
        .route("/api/v1/developer/projects", get(developer::projects))
        .route("/api/v1/developer/offers", get(developer::offers))
        .route("/api/v1/developer/termsheets", get(developer::term_sheets))
        // NDA
        .route("/api/v1/nda/template", get(nda::template))
        .route("/api/v1/nda/status", get(nda::status))
        .route("/api/v1/nda/sign", post(nda::sign))
        .route("/api/v1/nda/download", get(nda::download))
        // Payments
        .route(
            "/api/v1/payments/create-intent",
            post(payments::create_intent.layer(nda_gate.clone())),
        )
        .route("/api/v1/payments/confirm", post(payments::confirm))
        .route("/api/v1/payments/status", get(payments::status))
        .route("/api/v1/payments/history", get(payments::history))
        .route("/api/v1/payments/viewed", get(payments::viewed))
        // Offers
        .route(
            "/api/v1/offers",
            get(offers::list).post(offers::create.layer(nda_gate)),
        )
        .route(
            "/api/v1/offers/{id}",
            get(offers::get).delete(offers::withdraw),
        )
        .route("/api/v1/offers/{id}/respond", post(offers::respond))
        // Term sheets
        .route("/api/v1/termsheets", get(term_sheets::list))
        .route("/api/v1/termsheets/{id}", get(term_sheets::get))
        .route("/api/v1/termsheets/{id}/download", get(term_sheets::download))
        .route("/api/v1/termsheets/{id}/sign", post(term_sheets::sign))
        // Admin
        .route("/api/v1/admin/stats", get(admin::stats))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/projects", get(admin::list_projects))
        .route("/api/v1/admin/projects/pending", get(admin::pending_projects))
        .route(
            "/api/v1/admin/projects/{id}/approve",
            post(admin::review_project),
        )
        .route("/api/v1/admin/offers", get(admin::list_offers))
        .route("/api/v1/admin/payments", get(admin::list_payments))
        .route(
            "/api/v1/admin/termsheets/{id}/void",
            post(admin::void_term_sheet),
        )
        .route("/api/v1/admin/categories", post(admin::create_category))
        .route(
            "/api/v1/admin/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route("/api/v1/admin/audit", get(admin::audit_log))
}

/// Wrap rendered PDF bytes as a download.
pub fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
