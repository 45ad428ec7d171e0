use async_trait::async_trait;
use serde::Deserialize;

use super::{GatewayError, GatewayIntent, IntentRequest, IntentStatus, PaymentGateway};

const API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::from(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, secret_key })
    }

    async fn read(resp: reqwest::Response) -> Result<GatewayIntent, GatewayError> {
        let status = resp.status();
        if !status.is_success() {
            let body: ErrorEnvelope = resp.json().await.unwrap_or_default();
            let message = body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(GatewayError::from(format!("Stripe error: {message}")));
        }

        let intent: StripeIntent = resp
            .json()
            .await
            .map_err(|e| GatewayError::from(format!("Invalid Stripe response: {e}")))?;

        Ok(GatewayIntent {
            status: IntentStatus::parse(&intent.status),
            receipt_url: intent.latest_charge.and_then(|c| c.receipt_url),
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_intent(&self, req: &IntentRequest<'_>) -> Result<GatewayIntent, GatewayError> {
        let form = [
            ("amount", req.amount.to_string()),
            ("currency", req.currency.to_string()),
            ("description", req.description.to_string()),
            ("metadata[payment_id]", req.payment_id.to_string()),
            ("metadata[investor_id]", req.investor_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let resp = self
            .client
            .post(format!("{API_BASE}/payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", req.payment_id.to_string())
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::from(format!("Stripe request failed: {e}")))?;

        Self::read(resp).await
    }

    async fn retrieve_intent(&self, id: &str) -> Result<GatewayIntent, GatewayError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(GatewayError::from("Invalid payment intent id"));
        }

        let resp = self
            .client
            .get(format!("{API_BASE}/payment_intents/{id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("expand[]", "latest_charge")])
            .send()
            .await
            .map_err(|e| GatewayError::from(format!("Stripe request failed: {e}")))?;

        Self::read(resp).await
    }
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    status: String,
    client_secret: Option<String>,
    latest_charge: Option<StripeCharge>,
}

#[derive(Deserialize)]
struct StripeCharge {
    receipt_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    error: Option<StripeErrorBody>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expanded_charge_yields_receipt() {
        let intent: StripeIntent = serde_json::from_str(
            r#"{"id":"pi_1","status":"succeeded","client_secret":"pi_1_secret",
                "latest_charge":{"id":"ch_1","receipt_url":"https://pay.example/r/1"}}"#,
        )
        .unwrap();
        assert_eq!(intent.latest_charge.unwrap().receipt_url.as_deref(), Some("https://pay.example/r/1"));
    }

    #[test]
    fn unexpanded_charge_is_rejected_by_shape() {
        // latest_charge comes back as a bare id string unless expanded.
        let parsed = serde_json::from_str::<StripeIntent>(
            r#"{"id":"pi_1","status":"succeeded","client_secret":null,"latest_charge":"ch_1"}"#,
        );
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn malformed_intent_id_is_refused_locally() {
        let gateway = StripeGateway::new("sk_test_x".to_string()).unwrap();
        let err = gateway.retrieve_intent("../charges").await.unwrap_err();
        assert_eq!(err.message, "Invalid payment intent id");
    }
}
