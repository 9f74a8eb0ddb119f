use crate::cli::{
    actions::Action,
    commands::{self, logging},
    dispatch, telemetry,
};
use anyhow::Result;
use tracing::debug;

/// Parse the command line and prepare the action to run.
///
/// A `.env` file in the working directory is loaded first so its values act
/// as environment defaults for every flag.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialized or the arguments do
/// not describe a valid server.
pub fn start() -> Result<Action> {
    let dotenv = dotenvy::dotenv();

    let matches = commands::new().get_matches();

    let verbosity = matches
        .get_one::<u8>(logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or(0);

    telemetry::init(logging::level_for(verbosity))?;

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    dispatch::handler(&matches)
}
