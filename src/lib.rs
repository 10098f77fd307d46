//! User sign-up confirmation service library.

pub mod config;
pub mod confirmation;
pub mod http;
pub mod lifecycle;
pub mod mail;
pub mod observability;
pub mod store;

pub use config::schema::ServiceConfig;
pub use confirmation::{ConfirmationQueue, ConfirmationWorker};
pub use http::HttpServer;
pub use lifecycle::{Lifecycle, Running};
