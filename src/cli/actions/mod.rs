pub mod server;

mod run;

/// What the binary was asked to do once the command line is parsed.
#[derive(Debug)]
pub enum Action {
    /// Serve the gateway API and static files.
    Server(server::Args),
}

impl Action {
    /// # Errors
    /// Returns an error if the server cannot be built or stops with a failure.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
