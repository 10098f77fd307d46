//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Serve on a bound listener until the shared cancellation token fires
//! - Give in-flight requests a bounded grace period, then give up

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::confirmation::ConfirmationQueue;
use crate::http::handlers;
use crate::store::AccountStore;

/// Errors that end the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server did not shut down within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("server task failed: {0}")]
    Task(String),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub queue: ConfirmationQueue,
}

/// HTTP server for the confirmation service.
pub struct HttpServer {
    router: Router,
    grace: Duration,
}

impl HttpServer {
    /// Create a new HTTP server; `grace` bounds the drain of in-flight requests.
    pub fn new(state: AppState, grace: Duration) -> Self {
        Self {
            router: Self::build_router(state),
            grace,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/auth/sign-up", post(handlers::sign_up))
            .route("/api/users/confirm/{nonce}", get(handlers::confirm))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until `cancel` fires, then allow `grace` for open requests.
    pub async fn run(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server started");

        let stop = cancel.clone();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { stop.cancelled().await });
        let mut task = tokio::spawn(async move { serve.await });

        tokio::select! {
            result = &mut task => {
                // Serving ended without a cancellation.
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(ServerError::Serve(e)),
                    Err(e) => Err(ServerError::Task(e.to_string())),
                };
            }
            _ = cancel.cancelled() => {}
        }

        tracing::info!(grace = ?self.grace, "HTTP server stopping");
        match tokio::time::timeout(self.grace, &mut task).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("HTTP server exited properly");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(ServerError::Serve(e)),
            Ok(Err(e)) => Err(ServerError::Task(e.to_string())),
            Err(_) => {
                task.abort();
                Err(ServerError::ShutdownTimeout(self.grace))
            }
        }
    }
}
