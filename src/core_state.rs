//! Shared application state handed to every request handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::db;
use crate::dose::LowStockRule;
use crate::events::EventHub;
use crate::news::{GNewsClient, NewsError, NewsSource};
use crate::symptom_chat::{ChatError, GeminiClient, SymptomModel};

/// Source of the local wall-clock time used for slots and dose dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(at) => *at,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

/// Wrapped in `Arc` at startup and shared by the router and the
/// WebSocket handlers.
pub struct CoreState {
    pub config: AppConfig,
    pub sessions: SessionStore,
    pub events: EventHub,
    pub news: Arc<dyn NewsSource>,
    pub chat: Arc<dyn SymptomModel>,
    clock: Clock,
}

impl CoreState {
    pub fn new(
        config: AppConfig,
        news: Arc<dyn NewsSource>,
        chat: Arc<dyn SymptomModel>,
    ) -> Self {
        let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_secs));
        Self {
            config,
            sessions,
            events: EventHub::new(),
            news,
            chat,
            clock: Clock::System,
        }
    }

    /// State backed by the real GNews and Gemini clients.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let news = GNewsClient::new(&config.news)?;
        let chat = GeminiClient::new(&config.gemini)?;
        Ok(Self::new(config, Arc::new(news), Arc::new(chat)))
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Create the data directory and bring the schema up to date.
    pub fn init_storage(&self) -> Result<PathBuf, CoreError> {
        std::fs::create_dir_all(&self.config.data_dir).map_err(|source| CoreError::DataDir {
            path: self.config.data_dir.clone(),
            source,
        })?;
        let path = self.config.db_path();
        db::open_database(&path)?;
        tracing::info!(path = %path.display(), "Storage ready");
        Ok(path)
    }

    /// Open a connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.db_path()).map_err(CoreError::Database)
    }

    pub fn low_stock_rule(&self) -> LowStockRule {
        LowStockRule {
            threshold: self.config.low_stock_threshold,
            policy: self.config.low_stock_policy,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Cannot create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("News client error: {0}")]
    News(#[from] NewsError),
    #[error("Chat client error: {0}")]
    Chat(#[from] ChatError),
}
