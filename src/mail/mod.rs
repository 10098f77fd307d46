//! Outbound mail subsystem.
//!
//! # Data Flow
//! ```text
//! ConfirmationWorker
//!     → Mailer::send(recipients, from, subject, body)
//!     → log.rs  (development: write to the log)
//!     → http.rs (JSON mail API over HTTPS)
//! ```
//!
//! # Design Decisions
//! - One send operation; retries are the caller's business (there are none)
//! - Transport chosen once at startup from configuration

pub mod http;
pub mod log;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

pub use self::http::HttpMailer;
pub use self::log::LogMailer;

/// Errors that can occur while sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// The message was rejected before reaching the transport.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The transport could not be reached or timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The mail API answered with a non-success status.
    #[error("mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Mail delivery port.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        from: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError>;
}

/// Build the configured mail transport.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Http => Ok(Arc::new(HttpMailer::new(config)?)),
    }
}
