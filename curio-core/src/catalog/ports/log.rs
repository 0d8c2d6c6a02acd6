use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_model::prelude::AppLogEntry;

/// Persistence sink for the `tracing` layer described in the logging
/// section of the design notes. Kept separate from `tracing`'s own
/// machinery so the engine's call sites never depend on a concrete store.
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn append(&self, entry: &AppLogEntry) -> Result<()>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<AppLogEntry>>;
}
