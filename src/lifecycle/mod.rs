//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Bind listener → Start worker, coordinator, server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Close queue → Drain worker → Cancel token → Server stops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop intake, drain, then cancel
//! - Drain has a deadline; the server has its own grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{ShutdownCoordinator, ShutdownReport, ShutdownTrigger};
pub use signals::{Signals, TerminationSignal};
pub use startup::{Lifecycle, RunReport, Running, StartupError};
