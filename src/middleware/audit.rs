use sqlx::PgPool;
use uuid::Uuid;

/// Record a mutation in the audit log. Called explicitly by handlers after
/// the change commits. Failures are logged and never reach the caller.
pub async fn log_event(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) {
    if let Err(e) =
        crate::db::audit::log_event(pool, user_id, action, resource_type, resource_id, details)
            .await
    {
        tracing::error!(action, resource_type, "Failed to log audit event: {e}");
    }
}
