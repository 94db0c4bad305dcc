use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::{
    entities::email_logs::InsertEmailLogEntity, repositories::email_logs::EmailLogRepository,
    value_objects::enums::email_statuses::EmailStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailAction {
    PaymentConfirmation,
    Suspension,
    Reactivation,
    Termination,
    RenewalReminder,
}

impl Display for EmailAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self {
            EmailAction::PaymentConfirmation => "payment_confirmation",
            EmailAction::Suspension => "service_suspended",
            EmailAction::Reactivation => "service_reactivated",
            EmailAction::Termination => "service_terminated",
            EmailAction::RenewalReminder => "renewal_reminder",
        };
        write!(f, "{}", action)
    }
}

impl EmailAction {
    pub fn subject(&self) -> &'static str {
        match self {
            EmailAction::PaymentConfirmation => "Payment received — your server is on its way",
            EmailAction::Suspension => "Your server has been suspended",
            EmailAction::Reactivation => "Your server is back online",
            EmailAction::Termination => "Your service has been terminated",
            EmailAction::RenewalReminder => "Upcoming invoice due",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub action: EmailAction,
    pub recipient: String,
    pub params: HashMap<String, String>,
}

/// Fire-and-forget notifier. Every attempt is audited to `email_logs`;
/// failures never propagate to the caller.
#[async_trait]
#[automock]
pub trait EmailNotifier: Send + Sync {
    async fn send(&self, message: EmailMessage);
}

pub struct MailerClient {
    http: reqwest::Client,
    /// None puts the client in simulated mode (nothing leaves the box).
    endpoint: Option<String>,
    api_key: Option<String>,
    sender: String,
    email_logs: Arc<dyn EmailLogRepository + Send + Sync>,
}

impl MailerClient {
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        sender: String,
        email_logs: Arc<dyn EmailLogRepository + Send + Sync>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            sender,
            email_logs,
        }
    }

    async fn audit(&self, message: &EmailMessage, status: EmailStatus, error_message: Option<String>) {
        let entry = InsertEmailLogEntity {
            action: message.action.to_string(),
            recipient: message.recipient.clone(),
            subject: message.action.subject().to_string(),
            status: status.to_string(),
            error_message,
        };

        if let Err(err) = self.email_logs.record_email(entry).await {
            error!(
                action = %message.action,
                recipient = %message.recipient,
                db_error = ?err,
                "mailer: failed to write email audit log"
            );
        }
    }

    async fn deliver(&self, endpoint: &str, message: &EmailMessage) -> anyhow::Result<()> {
        let body = json!({
            "action": message.action.to_string(),
            "to": message.recipient,
            "from": self.sender,
            "subject": message.action.subject(),
            "params": message.params,
        });

        let mut request = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", api_key));
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("mailer responded with status {}", resp.status());
        }

        Ok(())
    }
}

#[async_trait]
impl EmailNotifier for MailerClient {
    async fn send(&self, message: EmailMessage) {
        let endpoint = match self.endpoint.as_deref() {
            Some(endpoint) => endpoint.to_string(),
            None => {
                info!(
                    action = %message.action,
                    recipient = %message.recipient,
                    "mailer: no endpoint configured, simulating send"
                );
                self.audit(&message, EmailStatus::Simulated, None).await;
                return;
            }
        };

        match self.deliver(&endpoint, &message).await {
            Ok(()) => {
                info!(
                    action = %message.action,
                    recipient = %message.recipient,
                    "mailer: email sent"
                );
                self.audit(&message, EmailStatus::Sent, None).await;
            }
            Err(err) => {
                warn!(
                    action = %message.action,
                    recipient = %message.recipient,
                    error = ?err,
                    "mailer: email delivery failed"
                );
                self.audit(&message, EmailStatus::Failed, Some(err.to_string()))
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::email_logs::MockEmailLogRepository;
    use uuid::Uuid;

    fn message() -> EmailMessage {
        EmailMessage {
            action: EmailAction::Suspension,
            recipient: "player@example.com".to_string(),
            params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn missing_endpoint_records_simulated_send() {
        let mut email_logs = MockEmailLogRepository::new();
        email_logs
            .expect_record_email()
            .withf(|entry| {
                entry.status == EmailStatus::Simulated.to_string()
                    && entry.action == "service_suspended"
                    && entry.error_message.is_none()
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let mailer = MailerClient::new(
            None,
            None,
            "billing@example.com".to_string(),
            Arc::new(email_logs),
        );

        mailer.send(message()).await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_records_failure() {
        let mut email_logs = MockEmailLogRepository::new();
        email_logs
            .expect_record_email()
            .withf(|entry| {
                entry.status == EmailStatus::Failed.to_string() && entry.error_message.is_some()
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        // Reserved TEST-NET-1 address; the connection fails fast.
        let mailer = MailerClient::new(
            Some("http://192.0.2.1:1/send".to_string()),
            None,
            "billing@example.com".to_string(),
            Arc::new(email_logs),
        );

        mailer.send(message()).await;
    }
}
