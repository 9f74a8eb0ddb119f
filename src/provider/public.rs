use super::{Endpoint, ProviderError, build_endpoint, check, http_client};
use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::{Instrument, info_span, instrument};

/// Session issued by the provider after a password sign-in.
///
/// Both parts are opaque and forwarded to the caller untouched.
#[derive(Debug, Clone)]
pub struct Session {
    pub session: Value,
    pub user: Value,
}

impl Session {
    /// A token response only counts as a session when it carries an access
    /// token; the user record is taken from the embedded `user` field.
    fn from_token_response(body: Value) -> Result<Self, ProviderError> {
        let has_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .is_some_and(|token| !token.is_empty());
        if !has_token {
            return Err(ProviderError::MissingSession);
        }

        let user = body.get("user").cloned().unwrap_or(Value::Null);
        Ok(Self {
            session: body,
            user,
        })
    }
}

/// Anonymous-key client used for password sign-in.
#[derive(Clone, Debug)]
pub struct PublicClient {
    http: Client,
    endpoint: Option<Endpoint>,
}

impl PublicClient {
    /// # Errors
    /// Returns an error if the URL is present but invalid or the HTTP client cannot be built.
    pub fn new(url: Option<&str>, anon_key: Option<SecretString>) -> Result<Self> {
        Ok(Self {
            http: http_client().context("Failed to build public HTTP client")?,
            endpoint: build_endpoint(url, anon_key).context("Invalid provider URL")?,
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    /// Returns [`ProviderError::Rejected`] for bad credentials,
    /// [`ProviderError::MissingSession`] when no access token is issued, or a
    /// transport/response error.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(ProviderError::Unconfigured("public"))?;
        let url = endpoint.url("auth/v1/token")?;

        let span = info_span!("provider.sign_in", http.method = "POST", url = %url);
        let response = endpoint
            .authorize(self.http.post(url))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .instrument(span)
            .await?;

        let response = check(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("token response: {e}")))?;

        Session::from_token_response(body)
    }
}
