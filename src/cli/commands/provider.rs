use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_ANON_KEY: &str = "anon-key";
pub const ARG_SERVICE_ROLE_KEY: &str = "service-role-key";

pub const ENV_PROVIDER_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Provider settings are optional at parse time; the server starts with a
/// warning when any of them is absent.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider base URL, example: https://<project>.supabase.co")
                .env(ENV_PROVIDER_URL),
        )
        .arg(
            Arg::new(ARG_ANON_KEY)
                .long(ARG_ANON_KEY)
                .help("Public (anonymous) API key used for password sign-in")
                .env(ENV_ANON_KEY)
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SERVICE_ROLE_KEY)
                .long(ARG_SERVICE_ROLE_KEY)
                .help("Privileged (service-role) API key used for account administration")
                .env(ENV_SERVICE_ROLE_KEY)
                .hide_env_values(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: Option<String>,
    pub anon_key: Option<SecretString>,
    pub service_role_key: Option<SecretString>,
}

impl Options {
    /// Empty values are treated as absent.
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let value = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            url: value(ARG_PROVIDER_URL),
            anon_key: value(ARG_ANON_KEY).map(SecretString::from),
            service_role_key: value(ARG_SERVICE_ROLE_KEY).map(SecretString::from),
        }
    }
}
