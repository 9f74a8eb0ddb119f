use super::{Endpoint, ProviderError, build_endpoint, check, http_client};
use anyhow::{Context, Result};
use reqwest::{Client, header::HeaderName};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{Instrument, debug, info_span, instrument};

const PROFILES_TABLE: &str = "profiles";
const PREFER_HEADER: HeaderName = HeaderName::from_static("prefer");

/// Account record as returned by the admin API.
///
/// Only the fields the gateway acts on are typed; the provider sends many more.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl ProviderUser {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at
            .as_deref()
            .is_some_and(|at| !at.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<ProviderUser>,
}

/// Row mirrored into the `profiles` table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

impl Profile {
    pub const DEFAULT_ROLE: &'static str = "user";

    #[must_use]
    pub fn new(user_id: String, username: String) -> Self {
        Self {
            user_id,
            username,
            role: Self::DEFAULT_ROLE.to_string(),
        }
    }
}

/// Service-role client for account administration and the profile table.
#[derive(Clone, Debug)]
pub struct AdminClient {
    http: Client,
    endpoint: Option<Endpoint>,
}

impl AdminClient {
    /// Build the admin client. A missing URL or key leaves the client
    /// unconfigured; every call then fails with [`ProviderError::Unconfigured`].
    ///
    /// # Errors
    /// Returns an error if the URL is present but invalid or the HTTP client cannot be built.
    pub fn new(url: Option<&str>, service_role_key: Option<SecretString>) -> Result<Self> {
        Ok(Self {
            http: http_client().context("Failed to build admin HTTP client")?,
            endpoint: build_endpoint(url, service_role_key).context("Invalid provider URL")?,
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn endpoint(&self) -> Result<&Endpoint, ProviderError> {
        self.endpoint
            .as_ref()
            .ok_or(ProviderError::Unconfigured("admin"))
    }

    /// Create an account with its email already confirmed, storing the
    /// username as user metadata.
    ///
    /// # Errors
    /// Returns [`ProviderError::Rejected`] with the provider's message (for
    /// example a duplicate email), or a transport/response error.
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<ProviderUser, ProviderError> {
        let endpoint = self.endpoint()?;
        let url = endpoint.url("auth/v1/admin/users")?;

        let payload = json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": { "username": username },
        });

        let span = info_span!("provider.create_user", http.method = "POST", url = %url);
        let response = endpoint
            .authorize(self.http.post(url))
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        let response = check(response).await?;
        let body: Value = response.json().await?;

        // Older GoTrue versions wrap the record in `user`.
        let record = body.get("user").filter(|v| v.is_object()).unwrap_or(&body);
        serde_json::from_value(record.clone())
            .map_err(|e| ProviderError::InvalidResponse(format!("created user: {e}")))
    }

    /// List one page of accounts.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not a user list.
    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ProviderUser>, ProviderError> {
        let endpoint = self.endpoint()?;
        let url = endpoint.url("auth/v1/admin/users")?;

        let span = info_span!("provider.list_users", http.method = "GET", url = %url);
        let response = endpoint
            .authorize(self.http.get(url))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .instrument(span)
            .await?;

        let response = check(response).await?;
        let list: UserList = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("user list: {e}")))?;

        debug!("listed {} users", list.users.len());

        Ok(list.users)
    }

    /// Mark the account's email as confirmed.
    ///
    /// # Errors
    /// Returns an error if the request fails or the provider rejects it.
    #[instrument(skip(self))]
    pub async fn confirm_email(&self, user_id: &str) -> Result<(), ProviderError> {
        let endpoint = self.endpoint()?;
        let url = endpoint.url(&format!("auth/v1/admin/users/{user_id}"))?;

        let span = info_span!("provider.confirm_email", http.method = "PUT", url = %url);
        let response = endpoint
            .authorize(self.http.put(url))
            .json(&json!({ "email_confirm": true }))
            .send()
            .instrument(span)
            .await?;

        check(response).await?;

        Ok(())
    }

    /// Insert or overwrite the profile row keyed by `user_id`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the table store rejects it.
    #[instrument(skip(self))]
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), ProviderError> {
        let endpoint = self.endpoint()?;
        let url = endpoint.url(&format!("rest/v1/{PROFILES_TABLE}"))?;

        let span = info_span!("provider.upsert_profile", http.method = "POST", url = %url);
        let response = endpoint
            .authorize(self.http.post(url))
            .query(&[("on_conflict", "user_id")])
            .header(PREFER_HEADER, "resolution=merge-duplicates,return=minimal")
            .json(profile)
            .send()
            .instrument(span)
            .await?;

        check(response).await?;

        Ok(())
    }
}
