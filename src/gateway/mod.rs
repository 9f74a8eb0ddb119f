//! Signup and login flows over the identity provider.
//!
//! Each call is a single pass with no retries. Signup runs three provider
//! steps (create account, upsert profile, sign in) without atomicity: a
//! failure after account creation leaves the account in place. Every step is
//! logged with the synthetic email so orphaned accounts can be reconciled by
//! hand.

pub mod email;
mod error;

pub use email::{DEFAULT_EMAIL_DOMAIN, normalize_username, synthetic_email};
pub use error::{GatewayError, Operation};

use crate::provider::{AdminClient, Profile, ProviderError, PublicClient, Session};
use tracing::{error, info, instrument, warn};

/// Login scans a single page of accounts; larger user bases are not fully
/// covered by the unconfirmed-email repair.
const LOOKUP_PAGE: u32 = 1;
const LOOKUP_PER_PAGE: u32 = 1000;

/// Username/password pair received with a request. Never persisted.
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Both fields must be present and non-empty.
    ///
    /// # Errors
    /// Returns [`GatewayError::MissingCredentials`] otherwise.
    pub fn new(username: Option<String>, password: Option<String>) -> Result<Self, GatewayError> {
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Self { username, password })
            }
            _ => Err(GatewayError::MissingCredentials),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Request-handling core holding the two provider clients.
#[derive(Clone, Debug)]
pub struct Gateway {
    admin: AdminClient,
    public: PublicClient,
    email_domain: String,
}

impl Gateway {
    #[must_use]
    pub fn new(admin: AdminClient, public: PublicClient, email_domain: String) -> Self {
        Self {
            admin,
            public,
            email_domain,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.admin.is_configured() && self.public.is_configured()
    }

    fn email_for(&self, credentials: &Credentials) -> Result<String, GatewayError> {
        synthetic_email(&credentials.username, &self.email_domain)
            .ok_or(GatewayError::InvalidUsername)
    }

    /// Create an account for `credentials` and sign it in.
    ///
    /// # Errors
    /// - [`GatewayError::InvalidUsername`] if the username normalizes to nothing.
    /// - [`GatewayError::SignupRejected`] with the provider's message if creation is refused.
    /// - [`GatewayError::PostSignupLoginFailed`] if the account exists but no session was issued.
    /// - [`GatewayError::UnexpectedFailure`] on transport or configuration problems.
    #[instrument(skip(self))]
    pub async fn signup(&self, credentials: &Credentials) -> Result<Session, GatewayError> {
        let email = self.email_for(credentials)?;

        let user = self
            .admin
            .create_user(&email, &credentials.password, &credentials.username)
            .await
            .map_err(|err| match err {
                ProviderError::Rejected { message, .. } => {
                    info!("signup rejected for {email}: {message}");
                    GatewayError::SignupRejected(message)
                }
                other => {
                    error!("Failed to create account for {email}: {other}");
                    GatewayError::UnexpectedFailure(Operation::Signup)
                }
            })?;

        info!("created account {} for {email}", user.id);

        // Best effort: the account already exists, a missing profile row does
        // not fail the signup.
        let profile = Profile::new(user.id.clone(), credentials.username.clone());
        if let Err(err) = self.admin.upsert_profile(&profile).await {
            warn!("Failed to upsert profile for {}: {err}", user.id);
        }

        match self
            .public
            .sign_in_with_password(&email, &credentials.password)
            .await
        {
            Ok(session) => {
                info!("signed in new account {}", user.id);
                Ok(session)
            }
            Err(err) => {
                error!(
                    "Account {} created but sign-in failed for {email}: {err}",
                    user.id
                );
                Err(GatewayError::PostSignupLoginFailed)
            }
        }
    }

    /// Sign in `credentials`, confirming the account's email first if needed.
    ///
    /// # Errors
    /// - [`GatewayError::InvalidUsername`] if the username normalizes to nothing.
    /// - [`GatewayError::InvalidCredentials`] for any failed sign-in attempt.
    /// - [`GatewayError::UnexpectedFailure`] if the public client is not configured.
    #[instrument(skip(self))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, GatewayError> {
        let email = self.email_for(credentials)?;

        self.confirm_if_pending(&email).await;

        self.public
            .sign_in_with_password(&email, &credentials.password)
            .await
            .map_err(|err| match err {
                ProviderError::Unconfigured(_) => {
                    error!("Cannot sign in {email}: {err}");
                    GatewayError::UnexpectedFailure(Operation::Login)
                }
                ProviderError::Rejected { .. } | ProviderError::MissingSession => {
                    info!("login failed for {email}: {err}");
                    GatewayError::InvalidCredentials
                }
                ProviderError::Transport(_) | ProviderError::InvalidResponse(_) => {
                    error!("login failed for {email}: {err}");
                    GatewayError::InvalidCredentials
                }
            })
    }

    /// Accounts can end up unconfirmed through other paths; confirm before
    /// sign-in. Failures are logged and never block the login.
    async fn confirm_if_pending(&self, email: &str) {
        let users = match self.admin.list_users(LOOKUP_PAGE, LOOKUP_PER_PAGE).await {
            Ok(users) => users,
            Err(err) => {
                warn!("Failed to list accounts: {err}");
                return;
            }
        };

        let Some(existing) = users
            .into_iter()
            .find(|user| user.email.as_deref() == Some(email))
        else {
            return;
        };

        if existing.is_confirmed() {
            return;
        }

        match self.admin.confirm_email(&existing.id).await {
            Ok(()) => info!("confirmed pending email for account {}", existing.id),
            Err(err) => warn!("Failed to confirm account {}: {err}", existing.id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn gateway(server: &MockServer) -> Gateway {
        let admin = AdminClient::new(
            Some(&server.uri()),
            Some(SecretString::from("service-key".to_string())),
        )
        .unwrap();
        let public = PublicClient::new(
            Some(&server.uri()),
            Some(SecretString::from("anon-key".to_string())),
        )
        .unwrap();
        Gateway::new(admin, public, DEFAULT_EMAIL_DOMAIN.to_string())
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials::new(Some(username.to_string()), Some(password.to_string())).unwrap()
    }

    fn token_body(user_id: &str) -> serde_json::Value {
        json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {"id": user_id}
        })
    }

    async fn mount_create_user(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/users"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_profiles(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    async fn mount_token(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_user_list(server: &MockServer, users: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": users })))
            .mount(server)
            .await;
    }

    #[test]
    fn credentials_require_both_fields() {
        assert_eq!(
            Credentials::new(Some("bob".to_string()), None).unwrap_err(),
            GatewayError::MissingCredentials
        );
        assert_eq!(
            Credentials::new(None, Some("x".to_string())).unwrap_err(),
            GatewayError::MissingCredentials
        );
        assert_eq!(
            Credentials::new(Some(String::new()), Some("x".to_string())).unwrap_err(),
            GatewayError::MissingCredentials
        );
        assert!(Credentials::new(Some("bob".to_string()), Some("x".to_string())).is_ok());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let debug = format!("{:?}", credentials("bob", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn invalid_username_makes_no_provider_calls() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let creds = credentials("★★★", "pw");

        assert_eq!(
            gateway.signup(&creds).await.unwrap_err(),
            GatewayError::InvalidUsername
        );
        assert_eq!(
            gateway.login(&creds).await.unwrap_err(),
            GatewayError::InvalidUsername
        );
    }

    #[tokio::test]
    async fn signup_then_login_returns_sessions() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_create_user(
            &server,
            200,
            json!({"id": "user-1", "email": "alice_1@demo.local", "email_confirmed_at": "2024-01-01T00:00:00Z"}),
        )
        .await;
        mount_profiles(&server, 201).await;
        mount_token(&server, 200, token_body("user-1")).await;
        mount_user_list(
            &server,
            json!([{"id": "user-1", "email": "alice_1@demo.local", "email_confirmed_at": "2024-01-01T00:00:00Z"}]),
        )
        .await;

        let gateway = gateway(&server);
        let creds = credentials("Alice_1", "secret");

        let signup = gateway.signup(&creds).await.unwrap();
        assert_eq!(signup.user, json!({"id": "user-1"}));

        let login = gateway.login(&creds).await.unwrap();
        assert_eq!(login.session.get("access_token"), Some(&json!("access")));
    }

    #[tokio::test]
    async fn duplicate_signup_forwards_provider_message() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_create_user(
            &server,
            422,
            json!({"code": 422, "error_code": "email_exists", "msg": "A user with this email address has already been registered"}),
        )
        .await;

        let err = gateway(&server)
            .signup(&credentials("bob", "x"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::SignupRejected(
                "A user with this email address has already been registered".to_string()
            )
        );
    }

    #[tokio::test]
    async fn profile_failure_does_not_fail_signup() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_create_user(&server, 200, json!({"id": "user-2"})).await;
        mount_profiles(&server, 500).await;
        mount_token(&server, 200, token_body("user-2")).await;

        let session = gateway(&server)
            .signup(&credentials("carol", "pw"))
            .await
            .unwrap();
        assert_eq!(session.user, json!({"id": "user-2"}));
    }

    #[tokio::test]
    async fn signup_without_session_is_reported_distinctly() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_create_user(&server, 200, json!({"id": "user-3"})).await;
        mount_profiles(&server, 201).await;
        mount_token(&server, 200, json!({"user": {"id": "user-3"}})).await;

        let err = gateway(&server)
            .signup(&credentials("dave", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::PostSignupLoginFailed);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unexpected_failure() {
        let gateway = Gateway::new(
            AdminClient::new(None, None).unwrap(),
            PublicClient::new(None, None).unwrap(),
            DEFAULT_EMAIL_DOMAIN.to_string(),
        );
        assert!(!gateway.is_configured());

        let err = gateway.signup(&credentials("erin", "pw")).await.unwrap_err();
        assert_eq!(err, GatewayError::UnexpectedFailure(Operation::Signup));

        let err = gateway.login(&credentials("erin", "pw")).await.unwrap_err();
        assert_eq!(err, GatewayError::UnexpectedFailure(Operation::Login));
    }

    #[tokio::test]
    async fn login_confirms_pending_account_first() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_user_list(
            &server,
            json!([
                {"id": "other", "email": "bobby@demo.local", "email_confirmed_at": null},
                {"id": "user-4", "email": "bob@demo.local", "email_confirmed_at": null}
            ]),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/admin/users/user-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user-4"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/admin/users/other"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        mount_token(&server, 200, token_body("user-4")).await;

        let session = gateway(&server)
            .login(&credentials("Bob", "pw"))
            .await
            .unwrap();
        assert_eq!(session.user, json!({"id": "user-4"}));
    }

    #[tokio::test]
    async fn login_for_unknown_user_is_invalid_credentials() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_user_list(&server, json!([])).await;
        mount_token(
            &server,
            400,
            json!({"error": "invalid_grant", "error_description": "Invalid login credentials"}),
        )
        .await;

        let err = gateway(&server)
            .login(&credentials("ghost", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::InvalidCredentials);
    }

    #[tokio::test]
    async fn login_ignores_listing_failure() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/admin/users"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        mount_token(&server, 200, token_body("user-5")).await;

        let session = gateway(&server)
            .login(&credentials("frank", "pw"))
            .await
            .unwrap();
        assert_eq!(session.user, json!({"id": "user-5"}));
    }
}
