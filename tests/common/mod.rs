//! Shared test doubles for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use confirm_service::config::ConfirmationConfig;
use confirm_service::confirmation::{
    ConfirmationWorker, MessageTemplate, RecordId, User, UserId, UserState,
};
use confirm_service::mail::{MailError, Mailer};
use confirm_service::store::{StoreError, UserStore};

pub const BASE_URL: &str = "http://localhost:8080";

/// One observed side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetState(UserId, UserState),
    CreateConfirmation { nonce: String, user_id: UserId },
    Send {
        recipients: Vec<String>,
        from: String,
        subject: String,
        body: String,
    },
}

/// Ordered log shared by the recording store and mailer.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn calls_for(&self, id: UserId) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::SetState(uid, _) => *uid == id,
                Call::CreateConfirmation { user_id, .. } => *user_id == id,
                Call::Send { .. } => false,
            })
            .collect()
    }
}

/// Store double that records every write and fails on demand.
#[derive(Default)]
pub struct RecordingStore {
    pub log: CallLog,
    next_record: AtomicU64,
    fail_state: Mutex<Option<UserState>>,
    fail_record: Mutex<bool>,
}

impl RecordingStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    /// Fail every `set_state` call targeting `state`.
    pub fn fail_state(&self, state: UserState) {
        *self.fail_state.lock().unwrap() = Some(state);
    }

    pub fn fail_record(&self) {
        *self.fail_record.lock().unwrap() = true;
    }
}

#[async_trait]
impl UserStore for RecordingStore {
    async fn set_state(&self, id: UserId, state: UserState) -> Result<(), StoreError> {
        if *self.fail_state.lock().unwrap() == Some(state) {
            return Err(StoreError::Unavailable("injected".into()));
        }
        self.log.push(Call::SetState(id, state));
        Ok(())
    }

    async fn create_confirmation(
        &self,
        nonce: &str,
        user_id: UserId,
    ) -> Result<RecordId, StoreError> {
        if *self.fail_record.lock().unwrap() {
            return Err(StoreError::Unavailable("injected".into()));
        }
        self.log.push(Call::CreateConfirmation {
            nonce: nonce.to_string(),
            user_id,
        });
        Ok(RecordId(self.next_record.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

/// Mailer double that records messages, optionally failing or holding each send.
#[derive(Default)]
pub struct RecordingMailer {
    pub log: CallLog,
    fail: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    pub sent: Notify,
}

impl RecordingMailer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        recipients: &[String],
        from: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().unwrap() {
            return Err(MailError::Transport("injected".into()));
        }
        self.log.push(Call::Send {
            recipients: recipients.to_vec(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        self.sent.notify_one();
        Ok(())
    }
}

pub fn user(id: u64, email: &str) -> User {
    User {
        id: UserId(id),
        email: email.to_string(),
        password_hash: String::new(),
        state: UserState::New,
    }
}

pub fn worker(store: Arc<RecordingStore>, mailer: Arc<RecordingMailer>) -> ConfirmationWorker {
    ConfirmationWorker::new(
        store,
        mailer,
        MessageTemplate::new(BASE_URL, &ConfirmationConfig::default()),
        32,
    )
}
