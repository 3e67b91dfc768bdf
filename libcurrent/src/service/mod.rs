//! Service layer for Current
//!
//! `CurrentService` is the single entry point used by the binaries. It opens
//! (and migrates) the database, builds the Bluesky client when a `[bluesky]`
//! section is configured, and hands both to its sub-services:
//!
//! - `PostingService`: create and delete posts, keeping the federated copy consistent
//! - `HistoryService`: read stored posts
//!
//! # Example
//!
//! ```no_run
//! use libcurrent::service::CurrentService;
//!
//! # async fn example() -> libcurrent::Result<()> {
//! let service = CurrentService::new().await?;
//!
//! let post = service.posting().create_post("Hello world", false).await?;
//! let page = service.history().page(1, None).await?;
//! assert_eq!(page.posts[0].id, post.id);
//! # Ok(())
//! # }
//! ```

pub mod history;
pub mod posting;

use std::sync::Arc;

use self::history::HistoryService;
use self::posting::PostingService;
use crate::federation::bluesky::BlueskyClient;
use crate::federation::Federation;
use crate::{Config, Database, Result};

/// Main service facade
///
/// Sub-services share the same `Arc<Database>`; the configuration is kept
/// behind an `Arc` for the binaries to read defaults from.
pub struct CurrentService {
    db: Arc<Database>,
    config: Arc<Config>,
    posting: PostingService,
    history: HistoryService,
}

impl CurrentService {
    /// Create a service from the default configuration file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the database
    /// cannot be opened or migrated.
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service from an explicit configuration
    pub async fn from_config(config: Config) -> Result<Self> {
        let db = Database::new(&config.database.path).await?;

        let federation = match config.bluesky.as_ref() {
            Some(bluesky) => {
                let client: Arc<dyn Federation> = Arc::new(BlueskyClient::new(bluesky)?);
                Some(client)
            }
            None => None,
        };

        Ok(Self::from_parts(config, db, federation))
    }

    /// Assemble a service from already-built parts
    pub fn from_parts(
        config: Config,
        db: Database,
        federation: Option<Arc<dyn Federation>>,
    ) -> Self {
        let db = Arc::new(db);
        let config = Arc::new(config);

        let posting = PostingService::new(Arc::clone(&db), federation);
        let history = HistoryService::new(Arc::clone(&db), config.defaults.page_size);

        Self {
            db,
            config,
            posting,
            history,
        }
    }

    /// Access the database directly
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Access the posting service
    pub fn posting(&self) -> &PostingService {
        &self.posting
    }

    /// Access the history service
    pub fn history(&self) -> &HistoryService {
        &self.history
    }
}
