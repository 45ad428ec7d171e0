use std::net::IpAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;
use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub app_name: String,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub cors_origins: Vec<HeaderValue>,
    pub log_level: String,
    pub upload_dir: PathBuf,
    pub access_token_minutes: i64,
    pub payment: PaymentConfig,
    pub admin: Option<AdminBootstrap>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Viewing fee in minor currency units.
    pub view_fee_amount: i64,
    pub view_fee_currency: String,
    /// Number of projects one paid bundle unlocks.
    pub max_project_views: i32,
    pub stripe_secret_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("ANGELHUB_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid ANGELHUB_HOST: {e}"))?;

        let port: u16 = env_or("ANGELHUB_PORT", "8080")
            .parse()
            .map_err(|e| format!("Invalid ANGELHUB_PORT: {e}"))?;

        let base_url = env_or("ANGELHUB_BASE_URL", &format!("http://{host}:{port}"));
        let app_name = env_or("ANGELHUB_APP_NAME", "AngelHub");

        let max_body_size: usize = env_or("ANGELHUB_MAX_BODY_SIZE", "6291456")
            .parse()
            .map_err(|e| format!("Invalid ANGELHUB_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("ANGELHUB_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid ANGELHUB_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cors_origins: Vec<HeaderValue> = env_or("ANGELHUB_CORS_ORIGINS", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                HeaderValue::from_str(s.trim())
                    .map_err(|e| format!("Invalid ANGELHUB_CORS_ORIGINS entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("ANGELHUB_LOG_LEVEL", "info");
        let upload_dir = PathBuf::from(env_or("ANGELHUB_UPLOAD_DIR", "./uploads"));

        let access_token_minutes: i64 = env_or("ANGELHUB_ACCESS_TOKEN_MINUTES", "60")
            .parse()
            .map_err(|e| format!("Invalid ANGELHUB_ACCESS_TOKEN_MINUTES: {e}"))?;

        let payment = PaymentConfig {
            view_fee_amount: env_or("ANGELHUB_VIEW_FEE_AMOUNT", "50000")
                .parse()
                .map_err(|e| format!("Invalid ANGELHUB_VIEW_FEE_AMOUNT: {e}"))?,
            view_fee_currency: env_or("ANGELHUB_VIEW_FEE_CURRENCY", "usd").to_lowercase(),
            max_project_views: env_or("ANGELHUB_MAX_PROJECT_VIEWS", "4")
                .parse()
                .map_err(|e| format!("Invalid ANGELHUB_MAX_PROJECT_VIEWS: {e}"))?,
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        };

        if payment.max_project_views < 1 {
            return Err("ANGELHUB_MAX_PROJECT_VIEWS must be at least 1".to_string());
        }

        let admin = match (
            std::env::var("ANGELHUB_ADMIN_EMAIL").ok(),
            std::env::var("ANGELHUB_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap { email, password })
            }
            _ => None,
        };

        let smtp = match (
            std::env::var("ANGELHUB_SMTP_HOST").ok(),
            std::env::var("ANGELHUB_SMTP_PORT").ok(),
            std::env::var("ANGELHUB_SMTP_USER").ok(),
            std::env::var("ANGELHUB_SMTP_PASS").ok(),
            std::env::var("ANGELHUB_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid ANGELHUB_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            app_name,
            max_body_size,
            trusted_proxies,
            cors_origins,
            log_level,
            upload_dir,
            access_token_minutes,
            payment,
            admin,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
