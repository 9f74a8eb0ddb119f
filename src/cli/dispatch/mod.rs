//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_EMAIL_DOMAIN, ARG_PORT, ARG_STATIC_DIR, provider};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let static_dir = matches
        .get_one::<String>(ARG_STATIC_DIR)
        .map(PathBuf::from)
        .context("missing required argument: --static-dir")?;
    let email_domain = matches
        .get_one::<String>(ARG_EMAIL_DOMAIN)
        .map(|domain| domain.trim().to_lowercase())
        .filter(|domain| !domain.is_empty())
        .context("missing required argument: --email-domain")?;

    let globals = GlobalArgs::new(provider::Options::parse(matches));

    Ok(Action::Server(Args {
        port,
        static_dir,
        email_domain,
        globals,
    }))
}
