//! Catalog-backed log sink. Turns `tracing` events into persisted
//! [`AppLogEntry`] rows, per `spec.md` §3, without coupling any call site
//! in the engine to the catalog.
//!
//! Installed as a [`tracing_subscriber::Layer`] alongside whatever
//! console/file formatting layer an embedder already runs; this layer
//! only ever writes to the catalog.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use curio_model::prelude::AppLogEntry;

use crate::catalog::ports::LogRepository;

/// Collects one event's `message` field and any other recorded fields into
/// a structured row. `tracing`'s field API only offers a visitor, so this
/// exists purely to adapt it.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    exception: Option<String>,
    fields: Map<String, Value>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field.name(), value.to_string());
    }
}

impl EventVisitor {
    fn record(&mut self, name: &str, rendered: String) {
        match name {
            "message" => self.message = Some(rendered),
            "error" | "exception" | "err" => self.exception = Some(rendered),
            _ => {
                self.fields.insert(name.to_string(), Value::String(rendered));
            }
        }
    }
}

/// A `tracing_subscriber::Layer` that forwards every event it sees to a
/// background task, which persists it through a [`LogRepository`]. Events
/// are pushed onto an unbounded channel from `on_event` (a synchronous
/// callback that cannot await the catalog) and drained by a single
/// consumer, mirroring the ingestion pipeline's bounded producer/single
/// consumer shape minus the backpressure: logging must never block the
/// call site that emitted it.
pub struct CatalogLogLayer {
    sender: mpsc::UnboundedSender<AppLogEntry>,
}

impl CatalogLogLayer {
    /// Spawns the background persistence task and returns the layer ready
    /// to install into a `tracing_subscriber::Registry`.
    pub fn spawn(logs: Arc<dyn LogRepository>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<AppLogEntry>();
        tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                if let Err(e) = logs.append(&entry).await {
                    // Nowhere else to put this: the log sink itself just
                    // failed. Fall back to stderr via tracing's own
                    // default subscriber rather than looping.
                    eprintln!("failed to persist log entry: {e}");
                }
            }
        });
        Self { sender }
    }
}

impl<S> Layer<S> for CatalogLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let properties_json = if visitor.fields.is_empty() {
            None
        } else {
            serde_json::to_string(&visitor.fields).ok()
        };

        let entry = AppLogEntry {
            id: curio_model::ids::AppLogEntryId::new(),
            timestamp_utc: Utc::now(),
            level: event.metadata().level().to_string(),
            category: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            exception: visitor.exception,
            properties_json,
        };

        // An unbounded sender only fails once the receiver half has been
        // dropped, i.e. the process is shutting down; nothing useful to do
        // with that error at a log call site.
        let _ = self.sender.send(entry);
    }
}

/// Installs the global `tracing` subscriber: an env-filtered fmt layer for
/// the console plus this module's catalog-backed sink. Mirrors the
/// teacher's own `registry().with(env_filter).with(fmt::layer()).init()`
/// startup sequence; the (unimplemented) HTTP entry point is expected to
/// call this once at process start, before seeding schedules or starting
/// the scheduler.
pub fn init(logs: Arc<dyn LogRepository>) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curio_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(CatalogLogLayer::spawn(logs))
        .init();
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use curio_contracts::error::Result;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[derive(Default)]
    struct RecordingLogRepository {
        entries: StdMutex<Vec<AppLogEntry>>,
    }

    #[async_trait]
    impl LogRepository for RecordingLogRepository {
        async fn append(&self, entry: &AppLogEntry) -> Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn list_recent(&self, limit: i64) -> Result<Vec<AppLogEntry>> {
            Ok(self.entries.lock().unwrap().iter().rev().take(limit as usize).cloned().collect())
        }
    }

    #[tokio::test]
    async fn an_event_emitted_through_the_layer_is_persisted_with_its_message_and_fields() {
        let logs = Arc::new(RecordingLogRepository::default());
        let layer = CatalogLogLayer::spawn(logs.clone());
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(post_id = "abc-123", "scan recovered from a transient failure");
        });

        // The background task persists asynchronously; give it a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let entries = logs.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "WARN");
        assert_eq!(entries[0].message, "scan recovered from a transient failure");
        assert!(entries[0].properties_json.as_deref().unwrap().contains("abc-123"));
    }
}
