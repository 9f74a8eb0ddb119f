use crate::cli::actions::{Action, server};
use anyhow::Result;
use tracing::info;

pub(super) async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => {
            info!(
                port = args.port,
                static_dir = %args.static_dir.display(),
                email_domain = %args.email_domain,
                "Starting credgate"
            );
            server::execute(args).await
        }
    }
}
