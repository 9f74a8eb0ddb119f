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
    path = "/api/login",
    request_body = CredentialsRequest,
    responses (
        (status = 200, description = "Signed in", body = AuthResponse, content_type = "application/json"),
        (status = 400, description = "Missing credentials or invalid username", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 413, description = "Request body over 6 MiB", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(gateway, payload))]
pub async fn login(
    gateway: Extension<Arc<Gateway>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, GatewayError> {
    let credentials = credentials(payload)?;
    let session = gateway.login(&credentials).await?;
    Ok(auth_response(session))
}
