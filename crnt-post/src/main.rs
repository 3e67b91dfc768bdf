//! crnt-post - Publish a post, optionally mirroring it to Bluesky

use anyhow::{Context, Result};
use clap::Parser;
use libcurrent::logging::LoggingConfig;
use libcurrent::service::CurrentService;
use libcurrent::{CurrentError, Post};
use serde::Serialize;
use std::io::{IsTerminal, Read};

#[derive(Parser, Debug)]
#[command(name = "crnt-post")]
#[command(version, about = "Publish a post, optionally mirroring it to Bluesky")]
#[command(long_about = r#"Publish a post to the local blog, optionally mirroring it to Bluesky.

Links written as [text](url) and @handle mentions become Bluesky rich-text
facets; the local copy keeps the original markdown.

EXAMPLES:
    # Post from an argument
    crnt-post "Hello world"

    # Post from stdin
    echo "Hello world" | crnt-post

    # Mirror to Bluesky (needs a [bluesky] section or CRNT_BSKY_* variables)
    crnt-post --federate "Read [the notes](https://example.com) @alice.bsky.social"

    # JSON output for scripting
    crnt-post --format json "Hello" | jq .id

EXIT CODES:
    0 - Success
    1 - Error (storage, network, remote rejection)
    2 - Bluesky authentication failed
    3 - Invalid input (empty content)
    4 - Federated to Bluesky but not stored locally
"#)]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Mirror the post to Bluesky
    #[arg(long, conflicts_with = "local")]
    federate: bool,

    /// Store locally only, even when federation is on by default
    #[arg(long)]
    local: bool,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct PostOutput<'a> {
    id: i64,
    created_at: String,
    content: &'a str,
    remote_uri: Option<&'a str>,
}

impl<'a> From<&'a Post> for PostOutput<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            id: post.id,
            created_at: post.created_at().to_rfc3339(),
            content: &post.content,
            remote_uri: post.remote_uri.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<CurrentError>()
        .map_or(1, CurrentError::exit_code)
}

/// Take content from the argument or, when piped, from stdin
///
/// Trailing newlines from `echo` and editors are dropped.
fn read_content(arg: Option<String>) -> Result<String> {
    let content = match arg {
        Some(content) => content,
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(CurrentError::InvalidInput(
                    "No content provided. Pass it as an argument or pipe it on stdin".to_string(),
                )
                .into());
            }

            let mut buffer = String::new();
            stdin
                .read_to_string(&mut buffer)
                .map_err(|e| CurrentError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            buffer
        }
    };

    Ok(content
        .trim_end_matches(|c: char| c == '\n' || c == '\r')
        .to_string())
}

async fn run(cli: Cli) -> Result<()> {
    let content = read_content(cli.content)?;
    let service = CurrentService::new().await?;

    let federate = if cli.local {
        false
    } else {
        cli.federate || service.config().defaults.federate
    };

    tracing::debug!(federate, bytes = content.len(), "Publishing post");

    let post = service.posting().create_post(&content, federate).await?;

    match cli.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&PostOutput::from(&post))
                .context("Failed to serialize post")?;
            println!("{}", json);
        }
        _ => match &post.remote_uri {
            Some(uri) => println!("{}\t{}", post.id, uri),
            None => println!("{}", post.id),
        },
    }

    Ok(())
}
