use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use angelhub::config::{AdminBootstrap, Config, PaymentConfig};
use angelhub::payments::PaymentGateway;
use angelhub::state::SharedState;

pub const PASSWORD: &str = "password123";
pub const ADMIN_EMAIL: &str = "admin@test.com";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub upload_dir: PathBuf,
    pub state: SharedState,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register a user with the given role, return (body, status).
    pub async fn register(&self, email: &str, password: &str, role: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({
                "email": email,
                "password": password,
                "first_name": "Test",
                "last_name": role,
                "role": role,
                "company_name": "Acme",
            }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Login and return the auth response body + status.
    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register a user and return its access token.
    pub async fn user_token(&self, email: &str, role: &str) -> String {
        let (body, status) = self.register(email, PASSWORD, role).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn investor(&self, email: &str) -> String {
        self.user_token(email, "investor").await
    }

    pub async fn developer(&self, email: &str) -> String {
        self.user_token(email, "developer").await
    }

    /// Create the admin account directly and log in as it.
    pub async fn admin(&self) -> String {
        angelhub::seed::ensure_admin(
            &self.pool,
            &AdminBootstrap {
                email: ADMIN_EMAIL.to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .await
        .expect("admin bootstrap failed");
        let (body, status) = self.login(ADMIN_EMAIL, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn first_category(&self) -> String {
        let resp = self
            .client
            .get(self.url("/api/v1/categories"))
            .send()
            .await
            .expect("categories request failed");
        let body: Value = resp.json().await.unwrap();
        body[0]["id"].as_str().unwrap().to_string()
    }

    /// Create a draft project, return the project JSON.
    pub async fn create_project(&self, token: &str, title: &str) -> Value {
        let category_id = self.first_category().await;
        let (body, status) = self
            .post_auth(
                "/api/v1/projects",
                token,
                &json!({
                    "category_id": category_id,
                    "title": title,
                    "tagline": "One line",
                    "description": "Teaser description",
                    "pitch_content": "Confidential pitch",
                    "min_investment": 10000.0,
                    "max_investment": 500000.0,
                    "equity_offered": 10.0,
                    "valuation_cap": 5000000.0,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
        body
    }

    /// Create, submit and approve a project. Returns its id.
    pub async fn approved_project(&self, dev_token: &str, admin_token: &str, title: &str) -> String {
        let project = self.create_project(dev_token, title).await;
        let id = project["id"].as_str().unwrap().to_string();

        let (body, status) = self
            .post_auth(&format!("/api/v1/projects/{id}/submit"), dev_token, &json!({}))
            .await;
        assert_eq!(status, StatusCode::OK, "submit failed: {body}");

        let (body, status) = self
            .post_auth(
                &format!("/api/v1/admin/projects/{id}/approve"),
                admin_token,
                &json!({ "approved": true }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approve failed: {body}");
        id
    }

    pub async fn sign_nda(&self, token: &str) -> (Value, StatusCode) {
        self.post_auth(
            "/api/v1/nda/sign",
            token,
            &json!({
                "signature_data": "Test Investor",
                "signed_name": "Test Investor",
                "agreed": true,
            }),
        )
        .await
    }

    /// Buy a view bundle in demo mode. Returns the confirmed payment JSON.
    pub async fn buy_views(&self, token: &str) -> Value {
        let (intent, status) = self
            .post_auth("/api/v1/payments/create-intent", token, &json!({}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create intent failed: {intent}");

        let (body, status) = self
            .post_auth(
                "/api/v1/payments/confirm",
                token,
                &json!({ "payment_id": intent["payment_id"] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "confirm failed: {body}");
        body["payment"].clone()
    }

    /// An investor with a signed NDA and a paid bundle.
    pub async fn paid_investor(&self, email: &str) -> String {
        let token = self.investor(email).await;
        let (body, status) = self.sign_nda(&token).await;
        assert_eq!(status, StatusCode::CREATED, "NDA sign failed: {body}");
        self.buy_views(&token).await;
        token
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request and return the raw bytes.
    pub async fn get_bytes(&self, path: &str, token: &str) -> (Vec<u8>, StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes().await.unwrap().to_vec();
        (bytes, status, content_type)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Upload an image as multipart form data.
    pub async fn upload_image(
        &self,
        token: &str,
        project_id: &str,
        file_name: &str,
        data: &[u8],
    ) -> (Value, StatusCode) {
        let boundary = "angelhubtestboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(
            format!(
                "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"is_primary\"\r\n\r\ntrue\r\n--{boundary}--\r\n"
            )
            .as_bytes(),
        );

        let resp = self
            .client
            .post(self.url(&format!("/api/v1/projects/{project_id}/images")))
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .expect("upload request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Spawn a test app with a fresh temporary database and upload directory.
/// No payment gateway is configured, so payments run in demo mode.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_gateway(None).await
}

/// Spawn the app with a card processor in place of demo mode.
pub async fn spawn_app_with_gateway(gateway: Option<Arc<dyn PaymentGateway>>) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let db_name = format!("angelhub_test_{}", Uuid::now_v7().simple());

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let upload_dir = std::env::temp_dir().join(&db_name);
    std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:0".to_string(),
        app_name: "AngelHub".to_string(),
        max_body_size: 6 * 1024 * 1024,
        trusted_proxies: vec![],
        cors_origins: vec![],
        log_level: "warn".to_string(),
        upload_dir: upload_dir.clone(),
        access_token_minutes: 60,
        payment: PaymentConfig {
            view_fee_amount: 50_000,
            view_fee_currency: "usd".to_string(),
            max_project_views: 2,
            stripe_secret_key: None,
        },
        admin: None,
        smtp: None,
    };

    let (app, state) = angelhub::build_app(pool.clone(), config, gateway);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        upload_dir,
        state,
    }
}

/// Drop stale test databases (useful after test crashes).
#[allow(dead_code)]
pub async fn cleanup_stale_test_dbs() {
    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    if let Ok(admin_pool) = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
    {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datname LIKE 'angelhub_test_%'",
        )
        .fetch_all(&admin_pool)
        .await
        .unwrap_or_default();

        for db_name in rows {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
                .execute(&admin_pool)
                .await;
        }
        admin_pool.close().await;
    }
}

/// Drop the test database and upload directory after a test completes.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;
    let _ = std::fs::remove_dir_all(&app.upload_dir);

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
