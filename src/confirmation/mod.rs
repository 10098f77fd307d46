//! User confirmation pipeline.
//!
//! # Data Flow
//! ```text
//! signup handler
//!     → queue.rs (bounded FIFO of User snapshots)
//!     → worker.rs (single consumer)
//!         1. nonce.rs      generate nonce
//!         2. store         set_state(PROCESSING)
//!         3. store         create_confirmation(nonce, user)
//!         4. message.rs    compose email → Mailer::send
//!         5. store         set_state(PENDING)
//! ```
//!
//! # Design Decisions
//! - Any failed step abandons the item; the loop continues with the next user
//! - Queue close is the worker's only stop signal

pub mod message;
pub mod nonce;
pub mod queue;
pub mod types;
pub mod worker;

pub use message::{ConfirmationEmail, MessageTemplate, CONFIRM_PATH};
pub use queue::{ConfirmationQueue, QueueClosed, QueueReceiver};
pub use types::{ConfirmationRecord, RecordId, User, UserId, UserState};
pub use worker::{ConfirmationWorker, Outcome, Stage, WorkerSummary};
