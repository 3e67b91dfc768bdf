use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use libcurrent::logging::LoggingConfig;
use libcurrent::service::CurrentService;
use libcurrent::{CurrentError, Post, PostPage};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "crnt-history")]
#[command(version, about = "Read stored posts")]
#[command(long_about = r#"Read stored posts, newest first.

EXAMPLES:
    # First page of posts
    crnt-history

    # Later pages
    crnt-history --page 3

    # Search content (case-insensitive substring match)
    crnt-history --search rust

    # Everything posted on one day (UTC)
    crnt-history --on 2024-03-10

    # One post
    crnt-history --id 1700000000

    # JSON output for scripting
    crnt-history --format json | jq '.posts[].content'

OUTPUT FORMATS:
    text - Human-readable text (default)
    json - The post, the list of posts or the page as JSON

EXIT CODES:
    0 - Success (including empty results)
    1 - Error (post not found, query failed, etc.)
    3 - Invalid input (bad date)
"#)]
struct Args {
    /// Show a single post
    #[arg(long, value_name = "ID", conflicts_with_all = ["on", "page", "search"])]
    id: Option<i64>,

    /// Show the posts of one UTC day
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with_all = ["page", "search"])]
    on: Option<String>,

    /// Page number, starting at 1
    #[arg(short, long, value_name = "N", allow_hyphen_values = true)]
    page: Option<i64>,

    /// Only posts containing this text
    #[arg(short, long, value_name = "TERM")]
    search: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct PostEntry<'a> {
    id: i64,
    created_at: String,
    content: &'a str,
    remote_uri: Option<&'a str>,
}

impl<'a> From<&'a Post> for PostEntry<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            id: post.id,
            created_at: post.created_at().to_rfc3339(),
            content: &post.content,
            remote_uri: post.remote_uri.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct PageEntry<'a> {
    page: u32,
    prev_page: Option<u32>,
    next_page: Option<u32>,
    posts: Vec<PostEntry<'a>>,
}

impl<'a> From<&'a PostPage> for PageEntry<'a> {
    fn from(page: &'a PostPage) -> Self {
        Self {
            page: page.page,
            prev_page: page.prev_page,
            next_page: page.next_page,
            posts: page.posts.iter().map(PostEntry::from).collect(),
        }
    }
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        CurrentError::InvalidInput(format!("Invalid date '{}'. Use YYYY-MM-DD", value)).into()
    })
}

fn print_text(post: &Post) {
    let timestamp = post.created_at().format("%Y-%m-%d %H:%M:%S");
    println!("{} | {}", timestamp, post.id);
    if let Some(uri) = &post.remote_uri {
        println!("  bluesky: {}", uri);
    }
    for line in post.content.lines() {
        println!("  {}", line);
    }
    println!();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    LoggingConfig::from_env(args.verbose).init();
    tracing::debug!("crnt-history started with args: {:?}", args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CurrentError>()
            .map_or(1, CurrentError::exit_code);
        std::process::exit(code);
    }
}

async fn run(args: Args) -> Result<()> {
    let service = CurrentService::new()
        .await
        .context("Failed to open post store")?;
    let history = service.history();
    let json = args.format == "json";

    if let Some(id) = args.id {
        let Some(post) = history.get(id).await? else {
            bail!("No post with id {}", id);
        };
        if json {
            print_json(&PostEntry::from(&post))?;
        } else {
            print_text(&post);
        }
        return Ok(());
    }

    if let Some(day) = args.on.as_deref() {
        let posts = history.on_date(parse_day(day)?).await?;
        if json {
            print_json(&posts.iter().map(PostEntry::from).collect::<Vec<_>>())?;
        } else {
            posts.iter().for_each(print_text);
        }
        return Ok(());
    }

    let page = history
        .page(args.page.unwrap_or(1), args.search.as_deref())
        .await?;

    if json {
        print_json(&PageEntry::from(&page))?;
    } else {
        page.posts.iter().for_each(print_text);
        if page.prev_page.is_some() || page.next_page.is_some() {
            let prev = page
                .prev_page
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            let next = page
                .next_page
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            println!("page {} (previous: {}, next: {})", page.page, prev, next);
        }
    }

    Ok(())
}
