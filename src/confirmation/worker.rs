//! Confirmation worker.
//!
//! # Responsibilities
//! - Drain the confirmation queue one user at a time, in FIFO order
//! - Drive each user `NEW → PROCESSING → PENDING`, sending the email in between
//! - Contain every per-item failure; the loop itself never fails
//!
//! # Design Decisions
//! - Strictly sequential: store writes are not otherwise synchronised
//! - A step's failure abandons the item without retry; state is never advanced
//!   past a step whose side effect failed
//! - In-flight items are not interrupted by shutdown; only the next dequeue is

use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use crate::confirmation::message::MessageTemplate;
use crate::confirmation::nonce::generate_nonce;
use crate::confirmation::queue::QueueReceiver;
use crate::confirmation::types::{RecordId, User, UserState};
use crate::mail::Mailer;
use crate::observability::metrics;
use crate::store::UserStore;

/// Pipeline step at which an item was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MarkProcessing,
    CreateRecord,
    SendMail,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::MarkProcessing => "mark_processing",
            Stage::CreateRecord => "create_record",
            Stage::SendMail => "send_mail",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing a single queued user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Email sent and user marked `PENDING`.
    Pending { record_id: RecordId },
    /// Email sent, but the `PENDING` write failed. The user stays `PROCESSING`.
    SentUnmarked { record_id: RecordId, reason: String },
    /// A step failed before the email went out.
    Abandoned { stage: Stage, reason: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pending { .. } => "pending",
            Outcome::SentUnmarked { .. } => "sent_unmarked",
            Outcome::Abandoned { .. } => "abandoned",
        }
    }
}

/// Per-outcome counts for one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub pending: usize,
    pub sent_unmarked: usize,
    pub abandoned: usize,
}

impl WorkerSummary {
    pub fn processed(&self) -> usize {
        self.pending + self.sent_unmarked + self.abandoned
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Pending { .. } => self.pending += 1,
            Outcome::SentUnmarked { .. } => self.sent_unmarked += 1,
            Outcome::Abandoned { .. } => self.abandoned += 1,
        }
    }
}

/// Single consumer of the confirmation queue.
pub struct ConfirmationWorker {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    template: MessageTemplate,
    nonce_length: usize,
}

impl ConfirmationWorker {
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        template: MessageTemplate,
        nonce_length: usize,
    ) -> Self {
        Self {
            store,
            mailer,
            template,
            nonce_length,
        }
    }

    /// Consume users until the queue is closed and empty.
    pub async fn run(self, mut queue: QueueReceiver) -> WorkerSummary {
        tracing::info!("Confirmation worker started");
        let mut summary = WorkerSummary::default();

        while let Some(user) = queue.recv().await {
            let span = tracing::info_span!("confirm_user", user_id = %user.id);
            let outcome = self.process_one(&user).instrument(span).await;
            metrics::record_confirmation_outcome(&outcome);
            summary.record(&outcome);
        }

        tracing::info!(
            processed = summary.processed(),
            pending = summary.pending,
            sent_unmarked = summary.sent_unmarked,
            abandoned = summary.abandoned,
            "Confirmation queue drained, worker exiting"
        );
        summary
    }

    /// Take one user through the confirmation steps.
    pub async fn process_one(&self, user: &User) -> Outcome {
        tracing::debug!(email = %user.email, state = %user.state, "Confirming user");
        let nonce = generate_nonce(self.nonce_length);

        if let Err(e) = self.store.set_state(user.id, UserState::Processing).await {
            return abandon(Stage::MarkProcessing, e);
        }

        let record_id = match self.store.create_confirmation(&nonce, user.id).await {
            Ok(id) => id,
            Err(e) => return abandon(Stage::CreateRecord, e),
        };

        let email = self.template.render(&user.email, &nonce);
        if let Err(e) = self
            .mailer
            .send(&email.recipients, &email.from, &email.subject, &email.body)
            .await
        {
            return abandon(Stage::SendMail, e);
        }

        if let Err(e) = self.store.set_state(user.id, UserState::Pending).await {
            tracing::error!(
                record_id = %record_id,
                error = %e,
                "Confirmation email sent but user could not be marked pending"
            );
            return Outcome::SentUnmarked {
                record_id,
                reason: e.to_string(),
            };
        }

        tracing::info!(record_id = %record_id, "Confirmation email sent");
        tracing::debug!(nonce = %nonce, "Confirmation nonce issued");
        Outcome::Pending { record_id }
    }
}

fn abandon(stage: Stage, error: impl fmt::Display) -> Outcome {
    tracing::warn!(stage = %stage, error = %error, "Abandoning confirmation");
    Outcome::Abandoned {
        stage,
        reason: error.to_string(),
    }
}
