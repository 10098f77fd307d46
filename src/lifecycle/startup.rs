//! Startup orchestration.
//!
//! # Responsibilities
//! - Own the process-wide lifecycle objects (queue, cancellation token, trackers)
//! - Bind the listener before anything starts, so bind errors are fatal early
//! - Start the confirmation worker, the shutdown coordinator and the HTTP server
//!
//! # Design Decisions
//! - Two trackers: `background` holds loops that must drain before cancellation
//!   (the confirmation worker); `process` holds what keeps the process alive
//!   (the coordinator and the HTTP server)
//! - Nothing is global; every task receives its handles at construction

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::ServiceConfig;
use crate::confirmation::queue::{self, ConfirmationQueue, QueueReceiver};
use crate::confirmation::{ConfirmationWorker, MessageTemplate, WorkerSummary};
use crate::http::{AppState, HttpServer, ServerError};
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::lifecycle::signals::TerminationSignal;
use crate::mail::Mailer;
use crate::store::{AccountStore, UserStore};

/// Errors that prevent the service from starting or finishing cleanly.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("shutdown coordinator failed: {0}")]
    Coordinator(String),
}

/// Process lifecycle before start.
pub struct Lifecycle {
    config: ServiceConfig,
    queue: ConfirmationQueue,
    receiver: QueueReceiver,
    cancel: CancellationToken,
    background: TaskTracker,
    process: TaskTracker,
}

impl Lifecycle {
    pub fn new(config: ServiceConfig) -> Self {
        let (queue, receiver) = queue::channel(config.confirmation.queue_capacity);
        Self {
            config,
            queue,
            receiver,
            cancel: CancellationToken::new(),
            background: TaskTracker::new(),
            process: TaskTracker::new(),
        }
    }

    /// Producer handle for the confirmation queue.
    pub fn queue(&self) -> ConfirmationQueue {
        self.queue.clone()
    }

    /// The shared cancellation token.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind the listener and start every long-running task.
    ///
    /// `signal` resolves when the process is asked to terminate.
    pub async fn start<S, F>(
        self,
        store: Arc<S>,
        mailer: Arc<dyn Mailer>,
        signal: F,
    ) -> Result<Running, StartupError>
    where
        S: AccountStore + 'static,
        F: Future<Output = TerminationSignal> + Send + 'static,
    {
        let address = self.config.listener.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { address, source })?;

        let template = MessageTemplate::new(&self.config.app.base_url, &self.config.confirmation);
        let user_store: Arc<dyn UserStore> = store.clone();
        let worker = ConfirmationWorker::new(
            user_store,
            mailer,
            template,
            self.config.confirmation.nonce_length,
        );
        let worker = self.background.spawn(worker.run(self.receiver));

        let drain_timeout = match self.config.shutdown.drain_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let coordinator = ShutdownCoordinator::new(
            self.queue.clone(),
            self.background.clone(),
            self.cancel.clone(),
            drain_timeout,
        );
        let shutdown = self.process.spawn(coordinator.run(signal));

        let accounts: Arc<dyn AccountStore> = store;
        let server = HttpServer::new(
            AppState {
                accounts,
                queue: self.queue.clone(),
            },
            Duration::from_secs(self.config.shutdown.server_grace_secs),
        );
        let server = self
            .process
            .spawn(server.run(listener, self.cancel.clone()));

        tracing::info!(address = %local_addr, "Service started");

        Ok(Running {
            local_addr,
            queue: self.queue,
            cancel: self.cancel,
            process: self.process,
            worker,
            shutdown,
            server,
        })
    }
}

/// Outcome of a full run.
#[derive(Debug)]
pub struct RunReport {
    pub shutdown: ShutdownReport,
    /// `None` when the worker was still busy at the drain deadline.
    pub worker: Option<WorkerSummary>,
}

/// A started service.
pub struct Running {
    local_addr: SocketAddr,
    queue: ConfirmationQueue,
    cancel: CancellationToken,
    process: TaskTracker,
    worker: JoinHandle<WorkerSummary>,
    shutdown: JoinHandle<ShutdownReport>,
    server: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn queue(&self) -> ConfirmationQueue {
        self.queue.clone()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Block until the coordinator and the server have both finished.
    pub async fn wait(self) -> Result<RunReport, StartupError> {
        self.process.close();

        let served = match self.server.await {
            Ok(result) => result,
            Err(e) => Err(ServerError::Task(e.to_string())),
        };
        if let Err(e) = &served {
            tracing::error!(error = %e, "HTTP server failed, shutting down");
            // Releases a coordinator still waiting for a signal.
            self.cancel.cancel();
        }

        let shutdown = self
            .shutdown
            .await
            .map_err(|e| StartupError::Coordinator(e.to_string()))?;
        self.process.wait().await;

        let worker = if shutdown.drained {
            self.worker.await.ok()
        } else {
            None
        };

        served?;
        Ok(RunReport { shutdown, worker })
    }
}
