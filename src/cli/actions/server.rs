use crate::{
    api,
    cli::globals::GlobalArgs,
    gateway::Gateway,
    provider::{AdminClient, PublicClient},
};
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub static_dir: PathBuf,
    pub email_domain: String,
    pub globals: GlobalArgs,
}

/// Build the provider clients and run the HTTP server.
///
/// Missing provider settings are reported but do not stop startup; requests
/// that need them fail at request time instead.
///
/// # Errors
/// Returns an error if a provided URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let missing = args.globals.missing();
    if !missing.is_empty() {
        warn!(
            "Missing provider settings: {}. Signup and login will fail until they are set",
            missing.join(", ")
        );
    }

    debug!("Global args: {:?}", args.globals);

    let GlobalArgs {
        provider_url,
        anon_key,
        service_role_key,
    } = args.globals;

    let admin = AdminClient::new(provider_url.as_deref(), service_role_key)?;
    let public = PublicClient::new(provider_url.as_deref(), anon_key)?;
    let gateway = Gateway::new(admin, public, args.email_domain);

    api::new(args.port, gateway, args.static_dir).await
}
