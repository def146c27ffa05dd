use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, message: MailMessage) -> Result<DeliveryResult>;
}

/// Wraps a plain text body in the storefront's email layout.
pub fn make_a_nice_email(text: &str) -> String {
    format!(
        r#"<div className="email" style="border: 1px solid black; padding: 20px; font-family: sans-serif; line-height: 2; font-size: 20px;">
  <h2>Hello There!</h2>
  <p>{}</p>
  <p>The Storefront Team</p>
</div>"#,
        text
    )
}

/// Mailer that logs every message and keeps it in an in-memory outbox instead of delivering it.
#[derive(Clone, Default)]
pub struct LogMailer {
    outbox: Arc<RwLock<Vec<MailMessage>>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<MailMessage> {
        self.outbox.read().await.clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send_mail(&self, message: MailMessage) -> Result<DeliveryResult> {
        let message_id = Uuid::new_v4().to_string();
        info!(
            message_id = %message_id,
            from = %message.from,
            to = %message.to,
            "Mail queued in outbox"
        );
        self.outbox.write().await.push(message);
        Ok(DeliveryResult { message_id })
    }
}
