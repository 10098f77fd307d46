//! Confirmation email composition.

use crate::config::ConfirmationConfig;

/// Path prefix of the confirmation endpoint. Links are `<base>/api/users/confirm/<nonce>`.
pub const CONFIRM_PATH: &str = "/api/users/confirm";

/// A fully addressed confirmation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub recipients: Vec<String>,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Builds confirmation emails from configuration.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    base_url: String,
    from: String,
    subject: String,
}

impl MessageTemplate {
    pub fn new(base_url: &str, config: &ConfirmationConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            from: config.from_address.clone(),
            subject: config.subject.clone(),
        }
    }

    /// Link the user follows to confirm their address.
    pub fn confirmation_link(&self, nonce: &str) -> String {
        format!("{}{}/{}", self.base_url, CONFIRM_PATH, nonce)
    }

    pub fn render(&self, email: &str, nonce: &str) -> ConfirmationEmail {
        let body = format!(
            "Hello {},\n Welcome to this app - whatever it is.  Please confirm your registration by clicking on this link {}",
            email,
            self.confirmation_link(nonce)
        );
        ConfirmationEmail {
            recipients: vec![email.to_string()],
            from: self.from.clone(),
            subject: self.subject.clone(),
            body,
        }
    }
}
