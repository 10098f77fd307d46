//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → handlers.rs
//!         POST /api/auth/sign-up        → AccountStore::create_user → ConfirmationQueue
//!         GET  /api/users/confirm/{n}   → AccountStore::confirm
//!         GET  /health
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer, ServerError};
