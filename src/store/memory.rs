//! In-memory store adapter.
//!
//! Backs development runs and tests. State is lost on restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::confirmation::types::{ConfirmationRecord, RecordId, User, UserId, UserState};
use crate::store::{AccountStore, StoreError, UserStore};

/// A thread-safe store keeping users and confirmation records in memory.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    /// Lowercased email -> user id.
    emails: DashMap<String, UserId>,
    /// Nonce -> record.
    records: DashMap<String, ConfirmationRecord>,
    next_user_id: AtomicU64,
    next_record_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmation records created for a user, oldest first.
    pub fn records_for(&self, user_id: UserId) -> Vec<ConfirmationRecord> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.value().user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id.0);
        records
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Salted SHA-256 digest, formatted `sha256$<salt>$<digest>`.
fn digest_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!("sha256${}${}", hex::encode(salt), hex::encode(hasher.finalize()))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn set_state(&self, id: UserId, state: UserState) -> Result<(), StoreError> {
        let mut user = self.users.get_mut(&id).ok_or(StoreError::UserNotFound(id))?;
        if state < user.state || state == UserState::Confirmed {
            return Err(StoreError::InvalidTransition {
                id,
                from: user.state,
                to: state,
            });
        }
        user.state = state;
        Ok(())
    }

    async fn create_confirmation(
        &self,
        nonce: &str,
        user_id: UserId,
    ) -> Result<RecordId, StoreError> {
        if !self.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound(user_id));
        }
        let id = RecordId(self.next_record_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.records.insert(
            nonce.to_string(),
            ConfirmationRecord {
                id,
                nonce: nonce.to_string(),
                user_id,
                created_at: now_secs(),
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let key = email.trim().to_lowercase();
        let id = match self.emails.entry(key) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateEmail(email.to_string())),
            Entry::Vacant(slot) => {
                let id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1);
                slot.insert(id);
                id
            }
        };

        let user = User {
            id,
            email: email.trim().to_string(),
            password_hash: digest_password(password),
            state: UserState::New,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<User, StoreError> {
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::UserNotFound(id))
    }

    async fn confirm(&self, nonce: &str) -> Result<User, StoreError> {
        let user_id = self
            .records
            .get(nonce)
            .map(|r| r.value().user_id)
            .ok_or(StoreError::NonceNotFound)?;

        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        if user.state != UserState::Pending {
            return Err(StoreError::InvalidTransition {
                id: user_id,
                from: user.state,
                to: UserState::Confirmed,
            });
        }
        // Lost a race with another confirmation of the same nonce.
        if self.records.remove(nonce).is_none() {
            return Err(StoreError::NonceNotFound);
        }
        user.state = UserState::Confirmed;
        Ok(user.clone())
    }
}
