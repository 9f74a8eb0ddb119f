use crate::{GIT_COMMIT_HASH, UNKNOWN_COMMIT, gateway::Gateway};
use axum::{
    extract::Extension,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

const X_APP: HeaderName = HeaderName::from_static("x-app");

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// URL and both keys are set.
    Ok,
    Unconfigured,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    provider: ProviderStatus,
}

impl Health {
    fn new(provider: ProviderStatus) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            provider,
        }
    }

    /// `name:version:short-commit`, the commit part empty when unknown.
    fn x_app(&self) -> Option<HeaderValue> {
        let short_commit = self
            .commit
            .get(..7)
            .filter(|_| self.commit != UNKNOWN_COMMIT);
        let value = format!(
            "{}:{}:{}",
            self.name,
            self.version,
            short_commit.unwrap_or_default()
        );
        HeaderValue::from_str(&value)
            .inspect_err(|err| warn!("Invalid X-App header value: {err}"))
            .ok()
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses (
        (status = 200, description = "Service is up; `provider` tells whether provider settings are present", body = Health),
    ),
    tag = "health"
)]
// GET returns the JSON body, OPTIONS only the headers.
pub async fn health(method: Method, gateway: Extension<Arc<Gateway>>) -> Response {
    let provider = if gateway.is_configured() {
        ProviderStatus::Ok
    } else {
        ProviderStatus::Unconfigured
    };
    let health = Health::new(provider);

    let mut response = if method == Method::GET {
        Json(&health).into_response()
    } else {
        StatusCode::OK.into_response()
    };

    if let Some(value) = health.x_app() {
        response.headers_mut().insert(X_APP, value);
    }

    response
}
