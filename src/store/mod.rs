//! User persistence ports.
//!
//! # Data Flow
//! ```text
//! signup handler ──create_user──▶ AccountStore
//! confirmation worker ──set_state / create_confirmation──▶ UserStore
//! confirm handler ──confirm(nonce)──▶ AccountStore
//! ```
//!
//! # Design Decisions
//! - The worker depends only on the narrow `UserStore` port
//! - Each call is an independent write; nothing spans several calls
//! - Adapters are shared as `Arc<dyn ...>` trait objects

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::confirmation::types::{RecordId, User, UserId, UserState};

pub use memory::MemoryStore;

/// Errors raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("email {0:?} is already registered")]
    DuplicateEmail(String),

    #[error("confirmation nonce not found")]
    NonceNotFound,

    #[error("user {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: UserId,
        from: UserState,
        to: UserState,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Port used by the confirmation worker.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new state for the user.
    async fn set_state(&self, id: UserId, state: UserState) -> Result<(), StoreError>;

    /// Persist a confirmation record linking `nonce` to the user.
    async fn create_confirmation(&self, nonce: &str, user_id: UserId)
        -> Result<RecordId, StoreError>;
}

/// Port used by the HTTP handlers.
#[async_trait]
pub trait AccountStore: UserStore {
    /// Register a user in state `NEW`.
    async fn create_user(&self, email: &str, password: &str) -> Result<User, StoreError>;

    async fn find_user(&self, id: UserId) -> Result<User, StoreError>;

    /// Consume a confirmation nonce and move its user from `PENDING` to `CONFIRMED`.
    async fn confirm(&self, nonce: &str) -> Result<User, StoreError>;
}
