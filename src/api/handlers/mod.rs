//! API handlers for credgate.
//!
//! Signup and login share the same request body and success shape; only the
//! gateway operation behind them differs.

pub mod health;
pub mod login;
pub mod signup;
pub mod types;

use crate::gateway::{Credentials, GatewayError};
use crate::provider::Session;
use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};
use tracing::debug;
use types::{AuthResponse, CredentialsRequest};

/// A body that is not the expected JSON counts as missing credentials;
/// only an oversized body is reported as such.
fn credentials(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Credentials, GatewayError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            debug!("Rejected oversized payload: {rejection}");
            return Err(GatewayError::PayloadTooLarge);
        }
        Err(rejection) => {
            debug!("Rejected credentials payload: {rejection}");
            CredentialsRequest::default()
        }
    };

    Credentials::new(request.username, request.password)
}

fn auth_response(session: Session) -> Json<AuthResponse> {
    Json(AuthResponse {
        ok: true,
        session: session.session,
        user: session.user,
    })
}
