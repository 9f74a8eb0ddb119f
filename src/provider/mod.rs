//! Clients for the external identity provider.
//!
//! The provider exposes a GoTrue auth API under `/auth/v1` and a PostgREST
//! table API under `/rest/v1`. Two clients are built once at startup:
//! [`AdminClient`] carries the service-role key and [`PublicClient`] the
//! anonymous key. Both are cheap to clone and never mutated after creation.

mod admin;
mod public;

pub use admin::{AdminClient, Profile, ProviderUser};
pub use public::{PublicClient, Session};

use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{AUTHORIZATION, HeaderName},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use url::Url;

const API_KEY_HEADER: HeaderName = HeaderName::from_static("apikey");

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0} client is not configured")]
    Unconfigured(&'static str),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    /// Sign-in succeeded at the HTTP level but no session was issued.
    #[error("provider returned no session")]
    MissingSession,
}

/// Base URL and API key for one privilege level.
#[derive(Clone)]
struct Endpoint {
    base: Url,
    key: SecretString,
}

impl Endpoint {
    /// Parse `url` as a provider base. A trailing slash is forced so joined
    /// paths keep any prefix in the base.
    fn new(url: &str, key: SecretString) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, key })
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid endpoint {path}: {e}")))
    }

    /// Attach the `apikey` and bearer headers the provider expects.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.key.expose_secret();
        request
            .header(API_KEY_HEADER, key)
            .header(AUTHORIZATION, format!("Bearer {key}"))
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base", &self.base.as_str())
            .field("key", &"***")
            .finish()
    }
}

fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(crate::APP_USER_AGENT).build()
}

fn build_endpoint(
    url: Option<&str>,
    key: Option<SecretString>,
) -> Result<Option<Endpoint>, url::ParseError> {
    match (url, key) {
        (Some(url), Some(key)) => Endpoint::new(url, key).map(Some),
        _ => Ok(None),
    }
}

/// Extract the human-readable message from a provider error body.
///
/// GoTrue uses `msg` (newer) or `error_description` (OAuth style), PostgREST
/// uses `message`. Falls back to the raw body, then to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|json| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|field| json.get(field).and_then(Value::as_str))
            .map(ToString::to_string)
    });

    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown provider error")
                .to_string()
        } else {
            trimmed.to_string()
        }
    })
}

/// Turn a non-success response into [`ProviderError::Rejected`].
async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Rejected {
        status,
        message: error_message(status, &body),
    })
}
