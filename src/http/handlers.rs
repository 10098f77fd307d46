//! Request handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::confirmation::User;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub status: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

type Reply = (StatusCode, Json<UserResponse>);

fn reply(route: &'static str, status: StatusCode, message: &str, user: Option<User>) -> Reply {
    metrics::record_request(route, status.as_u16());
    (
        status,
        Json(UserResponse {
            status: status.is_success(),
            message: message.to_string(),
            user,
        }),
    )
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Register a user and queue their confirmation email.
pub async fn sign_up(State(state): State<AppState>, Json(request): Json<SignUpRequest>) -> Reply {
    const ROUTE: &str = "sign_up";

    if request.email.trim().is_empty() {
        return reply(ROUTE, StatusCode::BAD_REQUEST, "Email address is required", None);
    }
    if request.password.is_empty() {
        return reply(ROUTE, StatusCode::BAD_REQUEST, "Password is required", None);
    }

    let user = match state.accounts.create_user(&request.email, &request.password).await {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail(_)) => {
            return reply(ROUTE, StatusCode::CONFLICT, "Email address already in use", None);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create user");
            return reply(ROUTE, StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user", None);
        }
    };

    if let Err(rejected) = state.queue.enqueue(user.clone()).await {
        tracing::warn!(
            user_id = %rejected.0.id,
            "Confirmation queue closed; user left unconfirmed"
        );
        return reply(
            ROUTE,
            StatusCode::SERVICE_UNAVAILABLE,
            "Confirmation is temporarily unavailable",
            None,
        );
    }

    tracing::info!(user_id = %user.id, "User created");
    reply(ROUTE, StatusCode::OK, "User has been created", Some(user))
}

/// Complete a confirmation from the emailed link.
pub async fn confirm(State(state): State<AppState>, Path(nonce): Path<String>) -> Reply {
    const ROUTE: &str = "confirm";

    match state.accounts.confirm(&nonce).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User confirmed");
            reply(ROUTE, StatusCode::OK, "Account confirmed", Some(user))
        }
        Err(StoreError::NonceNotFound) => {
            reply(ROUTE, StatusCode::NOT_FOUND, "Unknown confirmation link", None)
        }
        Err(StoreError::InvalidTransition { id, from, .. }) => {
            tracing::warn!(user_id = %id, state = %from, "Confirmation for user not pending");
            reply(
                ROUTE,
                StatusCode::CONFLICT,
                "Account is not awaiting confirmation",
                None,
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to confirm user");
            reply(ROUTE, StatusCode::INTERNAL_SERVER_ERROR, "Failed to confirm account", None)
        }
    }
}
