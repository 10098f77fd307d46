//! Mailer that writes messages to the log instead of delivering them.

use async_trait::async_trait;

use crate::mail::{MailError, Mailer};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        recipients: &[String],
        from: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if recipients.is_empty() {
            return Err(MailError::InvalidMessage("no recipients".to_string()));
        }
        tracing::info!(
            to = ?recipients,
            from = %from,
            subject = %subject,
            "Mail delivered to log"
        );
        tracing::debug!(body = %body, "Mail body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_recipient() {
        let mailer = LogMailer;
        assert!(mailer.send(&[], "f@x.com", "s", "b").await.is_err());
        assert!(mailer
            .send(&["a@b.com".to_string()], "f@x.com", "s", "b")
            .await
            .is_ok());
    }
}
