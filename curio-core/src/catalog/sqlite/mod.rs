pub mod pool;
pub mod repositories;
pub mod session;

use std::sync::Arc;

use sqlx::SqlitePool;

pub use pool::{connect, MIGRATOR};
pub use session::CatalogSession;

use crate::catalog::ports::{
    DuplicateRepository, JobExecutionRepository, LibraryRepository, LogRepository,
    PostRepository, ScheduleRepository, TagRepository,
};
use repositories::{
    SqliteDuplicateRepository, SqliteJobExecutionRepository, SqliteLibraryRepository,
    SqliteLogRepository, SqlitePostRepository, SqliteScheduleRepository, SqliteTagRepository,
};

/// The concrete catalog: one pool, one repository per aggregate.
///
/// Snapshot reads are plain queries against the shared pool (sqlite has no
/// separate "no tracking" read mode to model); anything that must happen
/// atomically goes through [`CatalogSession::begin`] instead.
#[derive(Clone, Debug)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    libraries: Arc<SqliteLibraryRepository>,
    posts: Arc<SqlitePostRepository>,
    tags: Arc<SqliteTagRepository>,
    duplicates: Arc<SqliteDuplicateRepository>,
    jobs: Arc<SqliteJobExecutionRepository>,
    schedules: Arc<SqliteScheduleRepository>,
    logs: Arc<SqliteLogRepository>,
}

impl SqliteCatalog {
    pub async fn connect(database_url: &str) -> curio_contracts::error::Result<Self> {
        let pool = connect(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            libraries: Arc::new(SqliteLibraryRepository::new(pool.clone())),
            posts: Arc::new(SqlitePostRepository::new(pool.clone())),
            tags: Arc::new(SqliteTagRepository::new(pool.clone())),
            duplicates: Arc::new(SqliteDuplicateRepository::new(pool.clone())),
            jobs: Arc::new(SqliteJobExecutionRepository::new(pool.clone())),
            schedules: Arc::new(SqliteScheduleRepository::new(pool.clone())),
            logs: Arc::new(SqliteLogRepository::new(pool.clone())),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin_session(&self) -> curio_contracts::error::Result<CatalogSession> {
        CatalogSession::begin(&self.pool).await
    }

    pub fn libraries(&self) -> Arc<dyn LibraryRepository> {
        self.libraries.clone()
    }

    pub fn posts(&self) -> Arc<dyn PostRepository> {
        self.posts.clone()
    }

    pub fn tags(&self) -> Arc<dyn TagRepository> {
        self.tags.clone()
    }

    pub fn duplicates(&self) -> Arc<dyn DuplicateRepository> {
        self.duplicates.clone()
    }

    pub fn jobs(&self) -> Arc<dyn JobExecutionRepository> {
        self.jobs.clone()
    }

    pub fn schedules(&self) -> Arc<dyn ScheduleRepository> {
        self.schedules.clone()
    }

    pub fn logs(&self) -> Arc<dyn LogRepository> {
        self.logs.clone()
    }
}
