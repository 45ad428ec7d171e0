use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::documents::DocumentStore;
use crate::email::Notifier;
use crate::payments::PaymentGateway;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub notifier: Notifier,
    /// `None` runs payments in demo mode.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub documents: DocumentStore,
    pub login_limiter: LoginRateLimiter,
}
