use super::{
    auth_response, credentials,
    types::{AuthResponse, CredentialsRequest, ErrorResponse},
};
use crate::gateway::{Gateway, GatewayError};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = CredentialsRequest,
    responses (
        (status = 200, description = "Account created and signed in", body = AuthResponse, content_type = "application/json"),
        (status = 400, description = "Missing credentials, invalid username, provider rejection, or sign-in after signup failed", body = ErrorResponse),
        (status = 413, description = "Request body over 6 MiB", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(gateway, payload))]
pub async fn signup(
    gateway: Extension<Arc<Gateway>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, GatewayError> {
    let credentials = credentials(payload)?;
    let session = gateway.signup(&credentials).await?;
    Ok(auth_response(session))
}
