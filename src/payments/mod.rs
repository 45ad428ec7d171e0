pub mod stripe;

use async_trait::async_trait;
use uuid::Uuid;

pub use stripe::StripeGateway;

/// What the platform asks a card processor to collect.
#[derive(Debug, Clone)]
pub struct IntentRequest<'a> {
    pub payment_id: Uuid,
    pub investor_id: Uuid,
    pub amount: i64,
    pub currency: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone)]
pub struct GatewayIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: IntentStatus,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    Succeeded,
    Processing,
    RequiresAction,
    Canceled,
    Other(String),
}

impl IntentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "succeeded" => IntentStatus::Succeeded,
            "processing" => IntentStatus::Processing,
            "requires_action" | "requires_confirmation" | "requires_payment_method" => {
                IntentStatus::RequiresAction
            }
            "canceled" => IntentStatus::Canceled,
            other => IntentStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct GatewayError {
    pub message: String,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<String> for GatewayError {
    fn from(s: String) -> Self {
        GatewayError { message: s }
    }
}

impl From<&str> for GatewayError {
    fn from(s: &str) -> Self {
        GatewayError {
            message: s.to_string(),
        }
    }
}

/// Card processor behind the view-fee flow. When none is configured the
/// platform runs in demo mode and confirms payments without charging.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;
    async fn create_intent(&self, req: &IntentRequest<'_>) -> Result<GatewayIntent, GatewayError>;
    async fn retrieve_intent(&self, id: &str) -> Result<GatewayIntent, GatewayError>;
}
