//! Domain types for the confirmation pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque numeric user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Account state.
///
/// Moves forward only: `New → Processing → Pending → Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserState {
    /// Registered, confirmation not yet started.
    New,
    /// Picked up by the confirmation worker.
    Processing,
    /// Confirmation email sent, waiting for the user.
    Pending,
    /// Confirmation link followed.
    Confirmed,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::New => "NEW",
            UserState::Processing => "PROCESSING",
            UserState::Pending => "PENDING",
            UserState::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown user state {0:?}")]
pub struct UnknownState(pub String);

impl FromStr for UserState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(UserState::New),
            "PROCESSING" => Ok(UserState::Processing),
            "PENDING" => Ok(UserState::Pending),
            "CONFIRMED" => Ok(UserState::Confirmed),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Snapshot of a user as handed to the confirmation queue.
///
/// The persistence layer owns the record; this copy is not refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub state: UserState,
}

/// Identifier assigned to a stored confirmation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable mapping from a nonce to the user it confirms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub id: RecordId,
    pub nonce: String,
    pub user_id: UserId,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}
