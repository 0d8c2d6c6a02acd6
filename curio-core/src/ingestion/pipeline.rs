use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use curio_contracts::error::{CoreError, Result};
use curio_model::prelude::Post;
use tokio::sync::Notify;
use tracing::{error, warn};

use crate::catalog::sqlite::SqliteCatalog;

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// A single long-running consumer draining a bounded FIFO of fully
/// constructed posts, per `spec.md` §4.6. Parallel scanners enqueue;
/// exactly one background task persists.
pub struct PostIngestionPipeline {
    sender: async_channel::Sender<Post>,
    pending: Arc<AtomicU64>,
    drained: Arc<Notify>,
    consumer: tokio::task::JoinHandle<()>,
}

impl PostIngestionPipeline {
    pub fn spawn(catalog: Arc<SqliteCatalog>, capacity: usize, batch_size: usize) -> Self {
        assert!(capacity >= 10, "ingestion capacity must be >= 10");
        assert!(batch_size >= 1, "ingestion batch size must be >= 1");

        let (sender, receiver) = async_channel::bounded(capacity);
        let pending = Arc::new(AtomicU64::new(0));
        let drained = Arc::new(Notify::new());

        let consumer = tokio::spawn(consume(
            receiver,
            catalog,
            batch_size,
            pending.clone(),
            drained.clone(),
        ));

        Self {
            sender,
            pending,
            drained,
            consumer,
        }
    }

    /// Enqueues a post, applying backpressure once the buffer is full.
    pub async fn enqueue(&self, post: Post) -> Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.sender
            .send(post)
            .await
            .map_err(|_| CoreError::Fatal("ingestion pipeline is closed".to_string()))
    }

    /// Blocks until every enqueued post has been persisted (or dropped
    /// after exhausting its retry). Raises if the consumer task has
    /// terminated unexpectedly (it should only exit after `shutdown`).
    pub async fn flush(&self) -> Result<()> {
        loop {
            if self.pending.load(Ordering::SeqCst) == 0 {
                return Ok(());
            }
            if self.consumer.is_finished() {
                return Err(CoreError::Fatal(
                    "ingestion consumer task terminated unexpectedly".to_string(),
                ));
            }
            tokio::select! {
                _ = self.drained.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
    }

    /// Closes the queue; the consumer drains whatever remains, then exits.
    pub async fn shutdown(self) -> Result<()> {
        self.sender.close();
        self.consumer
            .await
            .map_err(|e| CoreError::Fatal(e.to_string()))
    }

    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }
}

async fn consume(
    receiver: async_channel::Receiver<Post>,
    catalog: Arc<SqliteCatalog>,
    batch_size: usize,
    pending: Arc<AtomicU64>,
    drained: Arc<Notify>,
) {
    loop {
        let mut batch = Vec::with_capacity(batch_size);

        match receiver.recv().await {
            Ok(post) => batch.push(post),
            Err(_) => break,
        }

        while batch.len() < batch_size {
            match receiver.try_recv() {
                Ok(post) => batch.push(post),
                Err(_) => break,
            }
        }

        let batch_len = batch.len() as u64;
        if let Err(e) = save_with_retry(&catalog, &batch).await {
            error!(error = %e, batch_size = batch_len, "dropping ingestion batch after retry exhausted");
        }

        pending.fetch_sub(batch_len, Ordering::SeqCst);
        drained.notify_waiters();
    }
}

async fn save_with_retry(catalog: &SqliteCatalog, batch: &[Post]) -> Result<()> {
    match save_batch(catalog, batch).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(error = %e, "ingestion batch save failed, retrying once");
            tokio::time::sleep(RETRY_DELAY).await;
            save_batch(catalog, batch).await
        }
    }
}

async fn save_batch(catalog: &SqliteCatalog, batch: &[Post]) -> Result<()> {
    let mut session = catalog.begin_session().await?;
    session.insert_posts(batch).await?;
    session.commit().await
}
