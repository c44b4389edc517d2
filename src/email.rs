use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;

/// Outbound email message.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend for status-change emails. Callers treat delivery as
/// best-effort: failures are logged, never propagated into the request.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError>;
}

/// HTTP email API client. Posts the message as JSON with a bearer key.
#[derive(Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpEmailSender {
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        let mut request = self.client.post(&self.api_url).json(&message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::InternalError(format!("Email delivery failed: {e}")))?;

        if response.status().is_success() {
            info!("Email delivered");
            Ok(())
        } else {
            Err(ServiceError::InternalError(format!(
                "Email API returned status {}",
                response.status()
            )))
        }
    }
}

/// Used when no email endpoint is configured, and in tests.
#[derive(Clone, Default)]
pub struct NoopEmailSender;

#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        warn!(to = %message.to, subject = %message.subject, "Email delivery disabled, dropping message");
        Ok(())
    }
}

/// Body of the order status-change email: one line per item plus the new status.
pub fn order_status_body(order_id: uuid::Uuid, status: &str, items: &[(String, i32)]) -> String {
    let mut body = format!("Order {order_id} status changed to {status}.\n\nItems:\n");
    for (name, quantity) in items {
        body.push_str(&format!("- {name} x {quantity}\n"));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn order_status_body_lists_items() {
        let id = Uuid::new_v4();
        let body = order_status_body(
            id,
            "Delivered",
            &[("Blue shirt".to_string(), 5), ("Red cap".to_string(), 2)],
        );
        assert!(body.contains(&id.to_string()));
        assert!(body.contains("Delivered"));
        assert!(body.contains("- Blue shirt x 5"));
        assert!(body.contains("- Red cap x 2"));
    }

    #[tokio::test]
    async fn noop_sender_accepts_everything() {
        let sender = NoopEmailSender;
        let result = sender
            .send(EmailMessage {
                to: "user@example.com".to_string(),
                from: "noreply@wms.example".to_string(),
                subject: "Order Status Updated: Delivered".to_string(),
                body: "body".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
