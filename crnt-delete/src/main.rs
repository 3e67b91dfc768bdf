//! crnt-delete - Delete a post and, optionally, its Bluesky copy

use anyhow::Result;
use clap::Parser;
use libcurrent::logging::LoggingConfig;
use libcurrent::service::CurrentService;
use libcurrent::CurrentError;

#[derive(Parser, Debug)]
#[command(name = "crnt-delete")]
#[command(version, about = "Delete a post and, optionally, its Bluesky copy")]
#[command(long_about = r#"Delete a post by id (its Unix timestamp).

With --federate the Bluesky copy is deleted first. If that fails the local
post is kept, so it can be retried later.

EXAMPLES:
    # Delete locally only
    crnt-delete 1700000000

    # Delete the Bluesky copy as well
    crnt-delete --federate 1700000000

EXIT CODES:
    0 - Success (also when no post has that id)
    1 - Error (storage, network, remote rejection)
    2 - Bluesky authentication failed
"#)]
struct Cli {
    /// Id of the post to delete
    id: i64,

    /// Delete the Bluesky copy too
    #[arg(long, conflicts_with = "local")]
    federate: bool,

    /// Delete the local post only, even when federation is on by default
    #[arg(long)]
    local: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CurrentError>()
            .map_or(1, CurrentError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let service = CurrentService::new().await?;

    let federate = if cli.local {
        false
    } else {
        cli.federate || service.config().defaults.federate
    };

    service.posting().delete_post(cli.id, federate).await?;

    tracing::debug!(id = cli.id, federate, "Delete finished");
    Ok(())
}
