use crate::cli::commands::provider::{
    ENV_ANON_KEY, ENV_PROVIDER_URL, ENV_SERVICE_ROLE_KEY, Options,
};
use secrecy::SecretString;

/// Provider connection settings shared by both clients.
#[derive(Clone, Default)]
pub struct GlobalArgs {
    pub provider_url: Option<String>,
    pub anon_key: Option<SecretString>,
    pub service_role_key: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            provider_url: options.url,
            anon_key: options.anon_key,
            service_role_key: options.service_role_key,
        }
    }

    /// Environment names of the settings that were not provided.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.provider_url.is_none() {
            missing.push(ENV_PROVIDER_URL);
        }
        if self.anon_key.is_none() {
            missing.push(ENV_ANON_KEY);
        }
        if self.service_role_key.is_none() {
            missing.push(ENV_SERVICE_ROLE_KEY);
        }
        missing
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<SecretString>| key.as_ref().map(|_| "***");
        f.debug_struct("GlobalArgs")
            .field("provider_url", &self.provider_url)
            .field("anon_key", &redact(&self.anon_key))
            .field("service_role_key", &redact(&self.service_role_key))
            .finish()
    }
}
