mod common;

use std::sync::{Arc, OnceLock};

use angelhub::payments::{GatewayError, GatewayIntent, IntentRequest, IntentStatus, PaymentGateway};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use common::PASSWORD;

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

// ── Registration & Auth ─────────────────────────────────────────

#[tokio::test]
async fn register_returns_tokens() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("inv@test.com", PASSWORD, "investor").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["role"], "investor");
    assert_eq!(body["user"]["email_verified"], false);
    assert!(body["user"].get("password_hash").is_none());

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = common::spawn_app().await;
    app.investor("dup@test.com").await;

    let (_, status) = app.register("dup@test.com", PASSWORD, "developer").await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_admin_role_and_short_password() {
    let app = common::spawn_app().await;

    let (_, status) = app.register("a@test.com", PASSWORD, "admin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app.register("b@test.com", "short", "investor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_and_me() {
    let app = common::spawn_app().await;
    app.developer("dev@test.com").await;

    let (body, status) = app.login("dev@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let (me, status) = app.get_auth("/api/v1/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "dev@test.com");

    let (_, status) = app.login("dev@test.com", "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_is_throttled_after_repeated_failures() {
    let app = common::spawn_app().await;
    app.investor("slow@test.com").await;

    for _ in 0..5 {
        let (_, status) = app.login("slow@test.com", "wrongpassword").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (_, status) = app.login("slow@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}

#[tokio::test]
async fn protected_route_requires_auth() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn refresh_rotates_and_detects_reuse() {
    let app = common::spawn_app().await;
    let (body, _) = app.register("r@test.com", PASSWORD, "investor").await;
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated: serde_json::Value = resp.json().await.unwrap();
    let new_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, refresh);

    // Replaying the first token revokes every session, including the new one.
    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "token": new_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn verify_email_with_token() {
    let app = common::spawn_app().await;
    let token = app.investor("verify@test.com").await;

    let raw = "known-verification-token";
    sqlx::query("UPDATE users SET verify_token_hash = $1 WHERE email = 'verify@test.com'")
        .bind(angelhub::auth::tokens::hash(raw))
        .execute(&app.pool)
        .await
        .unwrap();

    let (_, status) = app
        .post_auth("/api/v1/auth/verify-email", &token, &json!({ "token": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .post_auth("/api/v1/auth/verify-email", &token, &json!({ "token": raw }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (me, _) = app.get_auth("/api/v1/auth/me", &token).await;
    assert_eq!(me["user"]["email_verified"], true);

    common::cleanup(app).await;
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/v1/auth/forgot-password"))
        .json(&json!({ "email": "nobody@test.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
async fn change_password_and_profile() {
    let app = common::spawn_app().await;
    let token = app.developer("cp@test.com").await;

    let (_, status) = app
        .post_auth(
            "/api/v1/auth/change-password",
            &token,
            &json!({ "current_password": "nottheone", "new_password": "newpassword456" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app
        .post_auth(
            "/api/v1/auth/change-password",
            &token,
            &json!({ "current_password": PASSWORD, "new_password": "newpassword456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app.login("cp@test.com", "newpassword456").await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .put_auth(
            "/api/v1/auth/profile",
            &token,
            &json!({ "bio": "Building things", "first_name": "Dana" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "Building things");
    assert_eq!(body["user"]["first_name"], "Dana");

    common::cleanup(app).await;
}

// ── Projects ────────────────────────────────────────────────────

#[tokio::test]
async fn categories_are_seeded() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/categories"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(!body.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn project_lifecycle_through_moderation() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;

    let project = app.create_project(&dev, "Solar Grid").await;
    let id = project["id"].as_str().unwrap();
    assert_eq!(project["status"], "draft");

    // Drafts are not listed publicly.
    let resp = app.client.get(app.url("/api/v1/projects")).send().await.unwrap();
    let listed: serde_json::Value = resp.json().await.unwrap();
    assert!(listed.as_array().unwrap().is_empty());

    // Only pending projects can be reviewed.
    let (_, status) = app
        .post_auth(
            &format!("/api/v1/admin/projects/{id}/approve"),
            &admin,
            &json!({ "approved": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (body, status) = app
        .post_auth(&format!("/api/v1/projects/{id}/submit"), &dev, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    // Pending projects are locked for editing.
    let category_id = app.first_category().await;
    let (_, status) = app
        .put_auth(
            &format!("/api/v1/projects/{id}"),
            &dev,
            &json!({ "category_id": category_id, "title": "Edited", "min_investment": 5.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Rejection needs a reason.
    let (_, status) = app
        .post_auth(
            &format!("/api/v1/admin/projects/{id}/approve"),
            &admin,
            &json!({ "approved": false }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/admin/projects/{id}/approve"),
            &admin,
            &json!({ "approved": false, "reason": "Needs financials" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["rejection_reason"], "Needs financials");

    // Rejected projects can be edited and resubmitted.
    let (body, status) = app
        .put_auth(
            &format!("/api/v1/projects/{id}"),
            &dev,
            &json!({ "category_id": category_id, "title": "Solar Grid v2", "min_investment": 5000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    app.post_auth(&format!("/api/v1/projects/{id}/submit"), &dev, &json!({}))
        .await;

    let (pending, _) = app.get_auth("/api/v1/admin/projects/pending", &admin).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/admin/projects/{id}/approve"),
            &admin,
            &json!({ "approved": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let resp = app
        .client
        .get(app.url("/api/v1/projects?search=solar"))
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Solar Grid v2");
    assert!(listed[0].get("pitch_content").is_none());

    common::cleanup(app).await;
}

#[tokio::test]
async fn investors_cannot_create_projects() {
    let app = common::spawn_app().await;
    let inv = app.investor("inv@test.com").await;
    let category_id = app.first_category().await;

    let (_, status) = app
        .post_auth(
            "/api/v1/projects",
            &inv,
            &json!({ "category_id": category_id, "title": "Nope", "min_investment": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn other_developers_see_only_public_view() {
    let app = common::spawn_app().await;
    let owner = app.developer("owner@test.com").await;
    let other = app.developer("other@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&owner, &admin, "Owned").await;

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{id}"), &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_access"], true);
    assert_eq!(body["project"]["pitch_content"], "Confidential pitch");

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{id}"), &other).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_access"], false);
    assert!(body["project"].get("pitch_content").is_none());

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_access"], true);

    common::cleanup(app).await;
}

#[tokio::test]
async fn image_upload_and_delete() {
    let app = common::spawn_app().await;
    let dev = app.developer("img@test.com").await;
    let project = app.create_project(&dev, "Pictures").await;
    let id = project["id"].as_str().unwrap();

    let (_, status) = app.upload_image(&dev, id, "script.exe", b"MZ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (image, status) = app.upload_image(&dev, id, "cover.png", b"\x89PNG fake").await;
    assert_eq!(status, StatusCode::CREATED, "{image}");
    assert_eq!(image["is_primary"], true);
    let path = image["file_path"].as_str().unwrap();
    assert!(path.starts_with(&format!("/uploads/projects/{id}/")));

    let resp = app.client.get(app.url(path)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"\x89PNG fake");

    let image_id = image["id"].as_str().unwrap();
    let (_, status) = app
        .delete_auth(&format!("/api/v1/projects/{id}/images/{image_id}"), &dev)
        .await;
    assert_eq!(status, StatusCode::OK);

    let resp = app.client.get(app.url(path)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn developer_dashboard_counts_pending_offers() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Counted").await;
    app.create_project(&dev, "Still a draft").await;

    let inv = app.paid_investor("inv@test.com").await;
    let (_, status) = app
        .post_auth(
            "/api/v1/offers",
            &inv,
            &json!({ "project_id": id, "offer_amount": 25000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (projects, status) = app.get_auth("/api/v1/developer/projects", &dev).await;
    assert_eq!(status, StatusCode::OK);
    let projects = projects.as_array().unwrap();
    assert_eq!(projects.len(), 2);
    let counted = projects.iter().find(|p| p["id"] == id.as_str()).unwrap();
    assert_eq!(counted["pending_offers"], 1);

    let (offers, _) = app.get_auth("/api/v1/developer/offers", &dev).await;
    assert_eq!(offers.as_array().unwrap().len(), 1);

    let (_, status) = app.get_auth("/api/v1/developer/projects", &inv).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

// ── Access gate ─────────────────────────────────────────────────

#[tokio::test]
async fn investor_gate_requires_nda_then_payment() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let first = app.approved_project(&dev, &admin, "First").await;
    let second = app.approved_project(&dev, &admin, "Second").await;
    let third = app.approved_project(&dev, &admin, "Third").await;
    let inv = app.investor("inv@test.com").await;

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{first}"), &inv).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NDA_REQUIRED");

    let (_, status) = app
        .post_auth("/api/v1/payments/create-intent", &inv, &json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (body, status) = app.sign_nda(&inv).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{first}"), &inv).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PAYMENT_REQUIRED");

    let payment = app.buy_views(&inv).await;
    assert_eq!(payment["status"], "completed");
    assert_eq!(payment["projects_remaining"], 2);

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{first}"), &inv).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_access"], true);
    assert_eq!(body["newly_unlocked"], true);
    assert_eq!(body["projects_remaining"], 1);
    assert_eq!(body["developer"]["email"], "dev@test.com");

    // Revisiting is free.
    let (body, status) = app.get_auth(&format!("/api/v1/projects/{first}"), &inv).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("newly_unlocked").is_none());
    assert_eq!(body["projects_remaining"], 1);

    let (body, _) = app.get_auth(&format!("/api/v1/projects/{second}"), &inv).await;
    assert_eq!(body["projects_remaining"], 0);

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{third}"), &inv).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NO_VIEWS_REMAINING");

    let (viewed, _) = app.get_auth("/api/v1/payments/viewed", &inv).await;
    assert_eq!(viewed["views"].as_array().unwrap().len(), 2);

    let (status_body, _) = app.get_auth("/api/v1/payments/status", &inv).await;
    assert_eq!(status_body["has_active_payment"], false);
    assert_eq!(status_body["projects_remaining"], 0);

    // An exhausted bundle can be replaced.
    app.buy_views(&inv).await;
    let (_, status) = app.get_auth(&format!("/api/v1/projects/{third}"), &inv).await;
    assert_eq!(status, StatusCode::OK);

    let (history, _) = app.get_auth("/api/v1/payments/history", &inv).await;
    assert_eq!(history["payments"].as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn concurrent_first_views_spend_one_credit() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Contended").await;
    let inv = app.paid_investor("inv@test.com").await;

    let path = format!("/api/v1/projects/{id}");
    let (a, b) = tokio::join!(app.get_auth(&path, &inv), app.get_auth(&path, &inv));
    assert_eq!(a.1, StatusCode::OK);
    assert_eq!(b.1, StatusCode::OK);

    let (status_body, _) = app.get_auth("/api/v1/payments/status", &inv).await;
    assert_eq!(status_body["projects_remaining"], 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn concurrent_first_views_of_different_projects_cannot_overspend() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let first = app.approved_project(&dev, &admin, "First").await;
    let second = app.approved_project(&dev, &admin, "Second").await;
    let third = app.approved_project(&dev, &admin, "Third").await;
    let inv = app.paid_investor("inv@test.com").await;

    let (_, status) = app.get_auth(&format!("/api/v1/projects/{first}"), &inv).await;
    assert_eq!(status, StatusCode::OK);

    let second_path = format!("/api/v1/projects/{second}");
    let third_path = format!("/api/v1/projects/{third}");
    let (a, b) = tokio::join!(
        app.get_auth(&second_path, &inv),
        app.get_auth(&third_path, &inv)
    );

    let mut statuses = [a.1, b.1];
    statuses.sort_by_key(|s| s.as_u16());
    assert_eq!(statuses, [StatusCode::OK, StatusCode::FORBIDDEN]);
    let denied = if a.1 == StatusCode::FORBIDDEN { &a.0 } else { &b.0 };
    assert_eq!(denied["code"], "NO_VIEWS_REMAINING");

    let (status_body, _) = app.get_auth("/api/v1/payments/status", &inv).await;
    assert_eq!(status_body["projects_remaining"], 0);

    let (viewed, _) = app.get_auth("/api/v1/payments/viewed", &inv).await;
    assert_eq!(viewed["views"].as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn expired_nda_is_reported_and_can_be_renewed() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Secret").await;
    let inv = app.paid_investor("inv@test.com").await;

    let (_, status) = app.sign_nda(&inv).await;
    assert_eq!(status, StatusCode::CONFLICT);

    sqlx::query(
        "UPDATE ndas SET signed_at = now() - interval '2 years 1 day', \
         expires_at = now() - interval '1 day'",
    )
        .execute(&app.pool)
        .await
        .unwrap();

    let (body, status) = app.get_auth(&format!("/api/v1/projects/{id}"), &inv).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NDA_EXPIRED");

    let (body, _) = app.get_auth("/api/v1/nda/status", &inv).await;
    assert_eq!(body["signed"], true);
    assert_eq!(body["valid"], false);

    let (_, status) = app.sign_nda(&inv).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, status) = app.get_auth(&format!("/api/v1/projects/{id}"), &inv).await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

// ── NDA ─────────────────────────────────────────────────────────

#[tokio::test]
async fn nda_template_sign_and_download() {
    let app = common::spawn_app().await;
    let inv = app.investor("inv@test.com").await;

    let (body, status) = app.get_auth("/api/v1/nda/template", &inv).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["template"].as_str().unwrap().contains("AngelHub"));
    assert_eq!(body["document_hash"].as_str().unwrap().len(), 64);
    let hash = body["document_hash"].clone();

    let (body, _) = app.get_auth("/api/v1/nda/status", &inv).await;
    assert_eq!(body["signed"], false);

    let (_, status) = app
        .post_auth(
            "/api/v1/nda/sign",
            &inv,
            &json!({ "signature_data": "x", "signed_name": "Test", "agreed": false }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app.sign_nda(&inv).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["nda"]["document_hash"], hash);
    assert!(body["nda"].get("signature_data").is_none());
    assert_eq!(body["nda"]["ip_address"], "127.0.0.1");

    let (body, _) = app.get_auth("/api/v1/nda/status", &inv).await;
    assert_eq!(body["signed"], true);
    assert_eq!(body["valid"], true);

    let (bytes, status, content_type) = app.get_bytes("/api/v1/nda/download", &inv).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/pdf");
    assert!(bytes.starts_with(b"%PDF"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn nda_routes_are_investor_only() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;

    let (_, status) = app.get_auth("/api/v1/nda/template", &dev).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn nda_signature_stands_when_document_path_cannot_be_recorded() {
    let app = common::spawn_app().await;
    let inv = app.investor("inv@test.com").await;

    sqlx::raw_sql(
        "CREATE FUNCTION reject_document_path() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'document path rejected'; END; $$ LANGUAGE plpgsql; \
         CREATE TRIGGER ndas_reject_document_path BEFORE UPDATE OF document_path ON ndas \
         FOR EACH ROW EXECUTE FUNCTION reject_document_path();",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let (body, status) = app.sign_nda(&inv).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["nda"]["document_path"].is_null());

    let (body, _) = app.get_auth("/api/v1/nda/status", &inv).await;
    assert_eq!(body["valid"], true);

    common::cleanup(app).await;
}

// ── Payments ────────────────────────────────────────────────────

#[tokio::test]
async fn payment_intent_in_demo_mode() {
    let app = common::spawn_app().await;
    let inv = app.investor("inv@test.com").await;
    app.sign_nda(&inv).await;

    let (intent, status) = app
        .post_auth("/api/v1/payments/create-intent", &inv, &json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(intent["client_secret"], "demo_mode");
    assert_eq!(intent["amount"], 50000);
    assert_eq!(intent["projects"], 2);

    let confirm = json!({ "payment_id": intent["payment_id"] });
    let (_, status) = app.post_auth("/api/v1/payments/confirm", &inv, &confirm).await;
    assert_eq!(status, StatusCode::OK);

    // Already settled.
    let (_, status) = app.post_auth("/api/v1/payments/confirm", &inv, &confirm).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // One active bundle at a time.
    let (_, status) = app
        .post_auth("/api/v1/payments/create-intent", &inv, &json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (body, _) = app.get_auth("/api/v1/payments/status", &inv).await;
    assert_eq!(body["has_active_payment"], true);
    assert_eq!(body["projects_total"], 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn payments_are_private_to_the_investor() {
    let app = common::spawn_app().await;
    let a = app.investor("a@test.com").await;
    let b = app.investor("b@test.com").await;
    app.sign_nda(&a).await;

    let (intent, _) = app
        .post_auth("/api/v1/payments/create-intent", &a, &json!({}))
        .await;
    let (_, status) = app
        .post_auth(
            "/api/v1/payments/confirm",
            &b,
            &json!({ "payment_id": intent["payment_id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

/// Card processor that approves every intent. While answering a lookup it
/// checks that no payment row is held under lock.
struct LockCheckingGateway {
    pool: OnceLock<sqlx::PgPool>,
}

#[async_trait]
impl PaymentGateway for LockCheckingGateway {
    fn name(&self) -> &str {
        "lock-checking"
    }

    async fn create_intent(&self, req: &IntentRequest<'_>) -> Result<GatewayIntent, GatewayError> {
        Ok(GatewayIntent {
            id: format!("pi_{}", req.payment_id.simple()),
            client_secret: Some("pi_secret".to_string()),
            status: IntentStatus::RequiresAction,
            receipt_url: None,
        })
    }

    async fn retrieve_intent(&self, id: &str) -> Result<GatewayIntent, GatewayError> {
        let pool = self.pool.get().ok_or("gateway pool not set")?;
        let mut tx = pool.begin().await.map_err(|e| e.to_string())?;
        sqlx::query("SELECT id FROM payments FOR UPDATE NOWAIT")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| format!("payment row is locked: {e}"))?;
        tx.rollback().await.map_err(|e| e.to_string())?;

        Ok(GatewayIntent {
            id: id.to_string(),
            client_secret: None,
            status: IntentStatus::Succeeded,
            receipt_url: Some("https://pay.example/r/1".to_string()),
        })
    }
}

#[tokio::test]
async fn gateway_lookup_runs_without_holding_the_payment_lock() {
    let gateway = Arc::new(LockCheckingGateway {
        pool: OnceLock::new(),
    });
    let shared: Arc<dyn PaymentGateway> = gateway.clone();
    let app = common::spawn_app_with_gateway(Some(shared)).await;
    let _ = gateway.pool.set(app.pool.clone());

    let inv = app.investor("inv@test.com").await;
    let (_, status) = app.sign_nda(&inv).await;
    assert_eq!(status, StatusCode::CREATED);

    let (intent, status) = app
        .post_auth("/api/v1/payments/create-intent", &inv, &json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{intent}");
    assert_eq!(intent["client_secret"], "pi_secret");
    assert_eq!(intent["demo_mode"], false);

    let (body, status) = app
        .post_auth(
            "/api/v1/payments/confirm",
            &inv,
            &json!({ "payment_id": intent["payment_id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payment"]["status"], "completed");

    let (_, status) = app
        .post_auth(
            "/api/v1/payments/confirm",
            &inv,
            &json!({ "payment_id": intent["payment_id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::cleanup(app).await;
}

// ── Offers & term sheets ────────────────────────────────────────

#[tokio::test]
async fn offer_validation_and_duplicates() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Offered").await;
    let inv = app.paid_investor("inv@test.com").await;

    let (_, status) = app
        .post_auth(
            "/api/v1/offers",
            &inv,
            &json!({ "project_id": id, "offer_amount": 100.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A rejected offer must not spend a credit.
    let (body, _) = app.get_auth("/api/v1/payments/status", &inv).await;
    assert_eq!(body["projects_remaining"], 2);

    let offer = json!({ "project_id": id, "offer_amount": 20000.0, "equity_requested": 5.0 });
    let (body, status) = app.post_auth("/api/v1/offers", &inv, &offer).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "pending");

    // Offering on a project the investor never opened unlocks it.
    let (body, _) = app.get_auth("/api/v1/payments/status", &inv).await;
    assert_eq!(body["projects_remaining"], 1);

    let (_, status) = app.post_auth("/api/v1/offers", &inv, &offer).await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::cleanup(app).await;
}

#[tokio::test]
async fn offer_requires_gate() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Gated").await;
    let inv = app.investor("inv@test.com").await;

    let offer = json!({ "project_id": id, "offer_amount": 20000.0 });
    let (body, status) = app.post_auth("/api/v1/offers", &inv, &offer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NDA_REQUIRED");

    app.sign_nda(&inv).await;
    let (body, status) = app.post_auth("/api/v1/offers", &inv, &offer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PAYMENT_REQUIRED");

    common::cleanup(app).await;
}

#[tokio::test]
async fn offer_reject_and_withdraw() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Picky").await;
    let inv = app.paid_investor("inv@test.com").await;

    let offer = json!({ "project_id": id, "offer_amount": 20000.0 });
    let (first, _) = app.post_auth("/api/v1/offers", &inv, &offer).await;
    let first_id = first["id"].as_str().unwrap();

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/offers/{first_id}/respond"),
            &dev,
            &json!({ "action": "reject", "response_notes": "Too low" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offer"]["status"], "rejected");
    assert!(body.get("term_sheet").is_none());

    // Settled offers cannot be answered again or withdrawn.
    let (_, status) = app
        .post_auth(
            &format!("/api/v1/offers/{first_id}/respond"),
            &dev,
            &json!({ "action": "accept" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, status) = app
        .delete_auth(&format!("/api/v1/offers/{first_id}"), &inv)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The pending slot is free again.
    let (second, status) = app.post_auth("/api/v1/offers", &inv, &offer).await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = second["id"].as_str().unwrap();

    let (body, status) = app
        .delete_auth(&format!("/api/v1/offers/{second_id}"), &inv)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "withdrawn");

    common::cleanup(app).await;
}

#[tokio::test]
async fn expired_offer_cannot_be_accepted() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Slow").await;
    let inv = app.paid_investor("inv@test.com").await;

    let (offer, _) = app
        .post_auth(
            "/api/v1/offers",
            &inv,
            &json!({ "project_id": id, "offer_amount": 20000.0 }),
        )
        .await;
    let offer_id = offer["id"].as_str().unwrap();

    sqlx::query("UPDATE investment_offers SET expires_at = now() - interval '1 minute'")
        .execute(&app.pool)
        .await
        .unwrap();

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/offers/{offer_id}/respond"),
            &dev,
            &json!({ "action": "accept" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("expired"));

    let (body, _) = app.get_auth(&format!("/api/v1/offers/{offer_id}"), &inv).await;
    assert_eq!(body["status"], "expired");

    common::cleanup(app).await;
}

#[tokio::test]
async fn housekeeping_leaves_offer_expiry_to_the_next_read() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Idle").await;
    let inv = app.paid_investor("inv@test.com").await;

    let (offer, _) = app
        .post_auth(
            "/api/v1/offers",
            &inv,
            &json!({ "project_id": id, "offer_amount": 20000.0 }),
        )
        .await;
    let offer_id = offer["id"].as_str().unwrap();

    sqlx::query("UPDATE investment_offers SET expires_at = now() - interval '1 minute'")
        .execute(&app.pool)
        .await
        .unwrap();

    angelhub::housekeeping_pass(&app.state).await;

    let stored: String = sqlx::query_scalar("SELECT status FROM investment_offers")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, "pending");

    let (body, _) = app.get_auth(&format!("/api/v1/offers/{offer_id}"), &inv).await;
    assert_eq!(body["status"], "expired");

    common::cleanup(app).await;
}

/// An accepted offer with its draft term sheet. Returns the sheet id and the
/// developer and investor tokens.
async fn accepted_deal(
    app: &common::TestApp,
) -> (String, String, String) {
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Dealt").await;
    let inv = app.paid_investor("inv@test.com").await;

    let (offer, _) = app
        .post_auth(
            "/api/v1/offers",
            &inv,
            &json!({ "project_id": id, "offer_amount": 50000.0, "equity_requested": 2.5 }),
        )
        .await;
    let offer_id = offer["id"].as_str().unwrap();

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/offers/{offer_id}/respond"),
            &dev,
            &json!({ "action": "accept", "discount_rate": 15.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let sheet = &body["term_sheet"];
    assert_eq!(sheet["status"], "draft");
    assert_eq!(sheet["investment_amount"], 50000.0);
    assert_eq!(sheet["valuation_cap"], 5000000.0);
    assert_eq!(sheet["discount_rate"], 15.0);
    assert_eq!(sheet["pro_rata_rights"], true);
    assert_eq!(sheet["mfn_clause"], false);

    (sheet["id"].as_str().unwrap().to_string(), dev, inv)
}

#[tokio::test]
async fn term_sheet_completes_investor_first() {
    let app = common::spawn_app().await;
    let (sheet, dev, inv) = accepted_deal(&app).await;
    let sign = json!({ "signature_data": "signed" });

    let (body, status) = app
        .post_auth(&format!("/api/v1/termsheets/{sheet}/sign"), &inv, &sign)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "investor_signed");
    assert!(body.get("investor_signature").is_none());

    let (_, status) = app
        .post_auth(&format!("/api/v1/termsheets/{sheet}/sign"), &inv, &sign)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (body, status) = app
        .post_auth(&format!("/api/v1/termsheets/{sheet}/sign"), &dev, &sign)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["document_path"].is_string());

    let (bytes, status, content_type) = app
        .get_bytes(&format!("/api/v1/termsheets/{sheet}/download"), &dev)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/pdf");
    assert!(bytes.starts_with(b"%PDF"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn term_sheet_completes_developer_first() {
    let app = common::spawn_app().await;
    let (sheet, dev, inv) = accepted_deal(&app).await;
    let sign = json!({ "signature_data": "signed" });

    let (body, status) = app
        .post_auth(&format!("/api/v1/termsheets/{sheet}/sign"), &dev, &sign)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "draft");
    assert!(body["developer_signed_at"].is_string());

    let (body, status) = app
        .post_auth(&format!("/api/v1/termsheets/{sheet}/sign"), &inv, &sign)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (sheets, _) = app.get_auth("/api/v1/developer/termsheets", &dev).await;
    assert_eq!(sheets[0]["status"], "completed");
    assert_eq!(sheets[0]["project_title"], "Dealt");

    common::cleanup(app).await;
}

#[tokio::test]
async fn outsiders_cannot_see_or_sign_term_sheets() {
    let app = common::spawn_app().await;
    let (sheet, _dev, _inv) = accepted_deal(&app).await;
    let outsider = app.investor("outsider@test.com").await;

    let (_, status) = app
        .get_auth(&format!("/api/v1/termsheets/{sheet}"), &outsider)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/termsheets/{sheet}/sign"),
            &outsider,
            &json!({ "signature_data": "forged" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (list, _) = app.get_auth("/api/v1/termsheets", &outsider).await;
    assert!(list.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
async fn voided_term_sheet_cannot_be_signed() {
    let app = common::spawn_app().await;
    let (sheet, dev, _inv) = accepted_deal(&app).await;
    let (body, _) = app.login(common::ADMIN_EMAIL, PASSWORD).await;
    let admin = body["access_token"].as_str().unwrap().to_string();

    let (body, status) = app
        .post_auth(&format!("/api/v1/admin/termsheets/{sheet}/void"), &admin, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "voided");

    let (_, status) = app
        .post_auth(&format!("/api/v1/admin/termsheets/{sheet}/void"), &admin, &json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/termsheets/{sheet}/sign"),
            &dev,
            &json!({ "signature_data": "late" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::cleanup(app).await;
}

// ── Admin ───────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_require_admin() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;

    let (_, status) = app.get_auth("/api/v1/admin/stats", &dev).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_stats_and_listings() {
    let app = common::spawn_app().await;
    let dev = app.developer("dev@test.com").await;
    let admin = app.admin().await;
    let id = app.approved_project(&dev, &admin, "Counted").await;
    let inv = app.paid_investor("inv@test.com").await;
    app.post_auth(
        "/api/v1/offers",
        &inv,
        &json!({ "project_id": id, "offer_amount": 20000.0 }),
    )
    .await;

    let (stats, status) = app.get_auth("/api/v1/admin/stats", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 3);
    assert_eq!(stats["total_investors"], 1);
    assert_eq!(stats["approved_projects"], 1);
    assert_eq!(stats["total_offers"], 1);
    assert_eq!(stats["completed_payments"], 1);
    assert_eq!(stats["total_revenue"], 50000);

    let (users, _) = app.get_auth("/api/v1/admin/users?role=developer", &admin).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    let (_, status) = app.get_auth("/api/v1/admin/users?role=owner", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (projects, _) = app
        .get_auth("/api/v1/admin/projects?status=approved", &admin)
        .await;
    assert_eq!(projects.as_array().unwrap().len(), 1);

    let (offers, _) = app.get_auth("/api/v1/admin/offers?status=pending", &admin).await;
    assert_eq!(offers.as_array().unwrap().len(), 1);

    let (payments, _) = app.get_auth("/api/v1/admin/payments", &admin).await;
    assert_eq!(payments[0]["investor_email"], "inv@test.com");

    let (events, _) = app
        .get_auth("/api/v1/admin/audit?resource_type=offer&limit=10", &admin)
        .await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["action"], "offer.created");

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_category_management() {
    let app = common::spawn_app().await;
    let admin = app.admin().await;
    let dev = app.developer("dev@test.com").await;

    let (category, status) = app
        .post_auth(
            "/api/v1/admin/categories",
            &admin,
            &json!({ "name": "SpaceTech", "description": "Orbit", "icon": "🚀" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = category["id"].as_str().unwrap();

    let (_, status) = app
        .post_auth("/api/v1/admin/categories", &admin, &json!({ "name": "SpaceTech" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (body, status) = app
        .put_auth(
            &format!("/api/v1/admin/categories/{id}"),
            &admin,
            &json!({ "description": "Beyond orbit" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "SpaceTech");
    assert_eq!(body["description"], "Beyond orbit");

    // Referenced categories cannot be deleted.
    let (_, status) = app
        .post_auth(
            "/api/v1/projects",
            &dev,
            &json!({ "category_id": id, "title": "Rocket", "min_investment": 1000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, status) = app
        .delete_auth(&format!("/api/v1/admin/categories/{id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (unused, _) = app
        .post_auth("/api/v1/admin/categories", &admin, &json!({ "name": "Unused" }))
        .await;
    let unused_id = unused["id"].as_str().unwrap();
    let (_, status) = app
        .delete_auth(&format!("/api/v1/admin/categories/{unused_id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app
        .delete_auth(&format!("/api/v1/admin/categories/{unused_id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}
