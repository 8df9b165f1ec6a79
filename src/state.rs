use std::sync::Arc;

use crate::auth::SessionStore;
use crate::board::{CategoryStore, PostStore, SearchDebouncer};
use crate::config::{Config, StorageBackend};
use crate::db;
use crate::ids::IdClock;
use crate::storage::{
    DynSnapshotBackend, FileBackend, MemoryBackend, Repository, SqliteBackend, CATEGORIES_KEY,
    POSTS_KEY, USER_KEY,
};

/// The three stores, built once at startup and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub categories: Arc<CategoryStore>,
    pub posts: Arc<PostStore>,
    pub search: Arc<SearchDebouncer>,
}

impl AppState {
    /// Open the configured snapshot backend and load every store from it.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let backend: DynSnapshotBackend = match (config.storage.backend, config.storage_path()) {
            (StorageBackend::Sqlite, Some(path)) => {
                let pool = db::open(path)?;
                tracing::info!("Using SQLite snapshots at {}", path.display());
                Arc::new(SqliteBackend::new(pool))
            }
            (StorageBackend::Files, Some(path)) => {
                tracing::info!("Using file snapshots in {}", path.display());
                Arc::new(FileBackend::new(path.clone()))
            }
            (StorageBackend::Memory, _) => {
                tracing::info!("Using in-memory snapshots; nothing will be saved");
                Arc::new(MemoryBackend::new())
            }
            (backend, None) => anyhow::bail!("No storage path configured for {:?}", backend),
        };

        Self::with_backend(config, backend).await
    }

    pub async fn with_backend(config: Config, backend: DynSnapshotBackend) -> anyhow::Result<Self> {
        let ids = Arc::new(IdClock::new());

        let sessions = SessionStore::open(
            Repository::new(backend.clone(), USER_KEY),
            ids.clone(),
            config.auth.session_settings(),
        )
        .await?;
        let categories =
            CategoryStore::open(Repository::new(backend.clone(), CATEGORIES_KEY), ids.clone())
                .await?;
        let posts = PostStore::open(
            Repository::new(backend, POSTS_KEY),
            ids,
            config.board.default_category.clone(),
        )
        .await?;
        let search = SearchDebouncer::new(config.search.debounce(), config.search.min_query_len);

        Ok(Self {
            config,
            sessions: Arc::new(sessions),
            categories: Arc::new(categories),
            posts: Arc::new(posts),
            search: Arc::new(search),
        })
    }
}
