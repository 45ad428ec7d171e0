pub mod templates;

use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::documents::safe::format_money;

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}

/// Fire-and-forget notifications. Without SMTP every message is logged
/// instead of sent. Delivery failures are logged and never surface to the
/// request that triggered them.
#[derive(Clone)]
pub struct Notifier {
    mailer: Option<Arc<SystemMailer>>,
    app_name: String,
    base_url: String,
}

impl Notifier {
    pub fn new(mailer: Option<SystemMailer>, app_name: &str, base_url: &str) -> Self {
        Self {
            mailer: mailer.map(Arc::new),
            app_name: app_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    pub fn verification(&self, to: &str, name: &str, token: &str) {
        let url = format!("{}/verify-email?token={token}", self.base_url);
        let html = templates::render_verification(&self.app_name, name, &url);
        self.dispatch(to, format!("Verify your email address - {}", self.app_name), html);
    }

    pub fn password_reset(&self, to: &str, name: &str, token: &str) {
        let url = format!("{}/reset-password?token={token}", self.base_url);
        let html = templates::render_password_reset(&self.app_name, name, &url);
        self.dispatch(to, format!("Reset your password - {}", self.app_name), html);
    }

    pub fn offer_received(
        &self,
        to: &str,
        developer_name: &str,
        investor_name: &str,
        project_title: &str,
        amount: f64,
    ) {
        let url = format!("{}/developer/offers", self.base_url);
        let html = templates::render_offer_received(
            &self.app_name,
            developer_name,
            investor_name,
            project_title,
            &format_money(amount),
            &url,
        );
        self.dispatch(to, format!("New Investment Offer for {project_title}"), html);
    }

    pub fn offer_response(
        &self,
        to: &str,
        investor_name: &str,
        project_title: &str,
        accepted: bool,
        notes: Option<&str>,
    ) {
        let url = format!("{}/offers", self.base_url);
        let html = templates::render_offer_response(
            &self.app_name,
            investor_name,
            project_title,
            accepted,
            notes,
            &url,
        );
        let outcome = if accepted { "accepted" } else { "rejected" };
        self.dispatch(to, format!("Your offer for {project_title} has been {outcome}"), html);
    }

    pub fn project_reviewed(
        &self,
        to: &str,
        developer_name: &str,
        project_title: &str,
        approved: bool,
        reason: Option<&str>,
    ) {
        let url = format!("{}/developer/projects", self.base_url);
        let html = templates::render_project_review(
            &self.app_name,
            developer_name,
            project_title,
            approved,
            reason,
            &url,
        );
        let outcome = if approved { "approved" } else { "rejected" };
        self.dispatch(to, format!("Your project has been {outcome}"), html);
    }

    pub fn term_sheet_signed(&self, to: &str, name: &str, project_title: &str, signer: &str) {
        let url = format!("{}/termsheets", self.base_url);
        let html =
            templates::render_term_sheet_signed(&self.app_name, name, project_title, signer, &url);
        self.dispatch(to, format!("Term sheet signed for {project_title}"), html);
    }

    pub fn term_sheet_completed(&self, to: &str, name: &str, project_title: &str) {
        let url = format!("{}/termsheets", self.base_url);
        let html = templates::render_term_sheet_completed(&self.app_name, name, project_title, &url);
        self.dispatch(to, format!("SAFE Agreement Completed for {project_title}"), html);
    }

    fn dispatch(&self, to: &str, subject: String, html: String) {
        let Some(mailer) = self.mailer.clone() else {
            tracing::info!(to, %subject, "SMTP not configured, email not sent");
            return;
        };
        let to = to.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &html).await {
                tracing::warn!(%to, %subject, "Notification failed: {e}");
            }
        });
    }
}
