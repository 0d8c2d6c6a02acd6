//! The job runtime: registration, single-instance-per-key starts,
//! cancellation, and bounded-lifetime live progress. See `spec.md` §4.9.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use curio_contracts::error::{CoreError, Result};
use curio_model::prelude::{JobExecution, JobExecutionId, JobStatus};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::catalog::ports::JobExecutionRepository;

use super::job::{Job, JobContext, JobMode};
use super::key::JobKey;
use super::reporter::JobReporter;

const LIVE_LINGER: Duration = Duration::from_secs(30);
const PERSIST_INTERVAL: Duration = Duration::from_secs(2);

struct LiveHandle {
    reporter: Arc<JobReporter>,
    cancel: CancellationToken,
}

/// Live snapshot surfaced by `JobService::live_info`.
#[derive(Debug, Clone)]
pub struct LiveJobInfo {
    pub execution_id: JobExecutionId,
    pub job_key: String,
    pub activity_text: String,
    pub progress_current: i64,
    pub progress_total: i64,
}

pub struct JobService {
    registry: DashMap<JobKey, Arc<dyn Job>>,
    running: DashMap<JobKey, JobExecutionId>,
    live: DashMap<JobExecutionId, LiveHandle>,
    repo: Arc<dyn JobExecutionRepository>,
    progress_report_interval: Duration,
}

impl JobService {
    pub fn new(repo: Arc<dyn JobExecutionRepository>, progress_report_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            registry: DashMap::new(),
            running: DashMap::new(),
            live: DashMap::new(),
            repo,
            progress_report_interval,
        })
    }

    pub fn register(&self, job: Arc<dyn Job>) {
        self.registry.insert(job.key(), job);
    }

    pub fn registered_jobs(&self) -> Vec<Arc<dyn Job>> {
        let mut jobs: Vec<Arc<dyn Job>> = self.registry.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by_key(|j| j.display_order());
        jobs
    }

    pub fn has_job(&self, key: JobKey) -> bool {
        self.registry.contains_key(&key)
    }

    /// Resolves a job name (as stored in [`curio_model::prelude::ScheduledJob::job_name`])
    /// against the registry, returning the registered `'static` [`JobKey`]
    /// rather than forcing the caller to fabricate one from a borrowed
    /// string. Used by the scheduler, which only ever has a `String` from
    /// the catalog to work with.
    pub fn resolve_key(&self, name: &str) -> Option<JobKey> {
        self.registry.iter().map(|entry| *entry.key()).find(|key| key.0 == name)
    }

    /// Resolves a legacy display name (e.g. `"Scan all libraries"`, as
    /// `JobExecution.job_name`/`ScheduledJob.job_name` held before the
    /// migration to stable keys) against each registered job's
    /// [`Job::name`]. Used only for one-time migration of old rows — live
    /// dispatch always resolves against [`Self::resolve_key`].
    pub fn resolve_key_by_display_name(&self, name: &str) -> Option<JobKey> {
        self.registry
            .iter()
            .find(|entry| entry.value().name() == name)
            .map(|entry| *entry.key())
    }

    pub fn live_info(&self, execution_id: JobExecutionId) -> Option<LiveJobInfo> {
        self.live.get(&execution_id).map(|handle| {
            let snapshot = handle.reporter.flush();
            LiveJobInfo {
                execution_id,
                job_key: String::new(),
                activity_text: snapshot.activity_text,
                progress_current: snapshot.progress_current,
                progress_total: snapshot.progress_total,
            }
        })
    }

    pub fn cancel_job(&self, execution_id: JobExecutionId) -> Result<()> {
        match self.live.get(&execution_id) {
            Some(handle) => {
                handle.cancel.cancel();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("no live job execution {execution_id}"))),
        }
    }

    pub async fn list_history(&self, job_key: Option<&str>, offset: i64, limit: i64) -> Result<Vec<JobExecution>> {
        self.repo.list_history(job_key, offset, limit).await
    }

    /// Starts a job by key. Rejects if the key is already running, or if
    /// `mode = All` is requested but unsupported.
    pub async fn start_job(self: &Arc<Self>, key: JobKey, mode: JobMode) -> Result<JobExecutionId> {
        let job = self
            .registry
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CoreError::NotFound(format!("no job registered for key {key}")))?;

        if mode == JobMode::All && !job.supports_all_mode() {
            return Err(CoreError::InvalidInput(format!("job {key} does not support mode=all")));
        }

        let execution_id = JobExecutionId::new();
        match self.running.entry(key) {
            Entry::Occupied(_) => return Err(CoreError::Conflict(format!("job {key} is already running"))),
            Entry::Vacant(v) => {
                v.insert(execution_id);
            }
        }

        let start_time = Utc::now();
        let initial = JobExecution {
            id: execution_id,
            job_key: key.0.to_string(),
            job_name: job.name().to_string(),
            status: JobStatus::Running,
            start_time,
            end_time: None,
            error_message: None,
            activity_text: "Starting...".to_string(),
            final_text: None,
            progress_current: 0,
            progress_total: 0,
            result_schema_version: None,
            result_json: None,
        };
        if let Err(e) = self.repo.create_execution(&initial).await {
            self.running.remove(&key);
            return Err(e);
        }

        let reporter = Arc::new(JobReporter::new(
            execution_id,
            key.0.to_string(),
            job.name().to_string(),
            self.progress_report_interval,
        ));
        let cancel = CancellationToken::new();
        self.live.insert(
            execution_id,
            LiveHandle {
                reporter: reporter.clone(),
                cancel: cancel.clone(),
            },
        );

        let service = self.clone();
        tokio::spawn(async move {
            service.run_to_completion(key, execution_id, job, reporter, cancel, mode).await;
        });

        Ok(execution_id)
    }

    async fn run_to_completion(
        self: Arc<Self>,
        key: JobKey,
        execution_id: JobExecutionId,
        job: Arc<dyn Job>,
        reporter: Arc<JobReporter>,
        cancel: CancellationToken,
        mode: JobMode,
    ) {
        let persist_repo = self.repo.clone();
        let persist_reporter = reporter.clone();
        let persistence = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PERSIST_INTERVAL);
            loop {
                ticker.tick().await;
                if let Some(snapshot) = persist_reporter.poll() {
                    let execution = persist_reporter.to_execution(&snapshot, JobStatus::Running, None, None);
                    if let Err(e) = persist_repo.update_execution(&execution).await {
                        warn!(error = %e, "failed to persist job progress");
                    }
                }
            }
        });

        let ctx = JobContext {
            reporter: reporter.clone(),
            cancel: cancel.clone(),
            mode,
        };

        let result = tokio::select! {
            r = job.execute(ctx) => r,
            _ = cancel.cancelled() => Err(CoreError::Cancelled),
        };

        persistence.abort();

        let (status, error_message) = match &result {
            Ok(()) => (JobStatus::Completed, None),
            Err(CoreError::Cancelled) => (JobStatus::Cancelled, None),
            Err(e) => (JobStatus::Failed, Some(e.to_string())),
        };

        if reporter.flush().activity_text.is_empty() {
            reporter.set_activity("Completed");
        }
        if result.is_ok() {
            let needs_final = reporter.flush().final_text.is_none();
            if needs_final {
                reporter.set_final_text("Completed successfully.");
            }
        } else if let Err(e) = &result {
            reporter.set_final_text(e.to_string());
        }

        let final_snapshot = reporter.flush();
        let execution = reporter.to_execution(&final_snapshot, status, Some(Utc::now()), error_message);
        if let Err(e) = self.repo.update_execution(&execution).await {
            error!(error = %e, execution_id = %execution_id, "failed to persist terminal job state");
        }

        self.running.remove(&key);

        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(LIVE_LINGER).await;
            service.live.remove(&execution_id);
        });
    }
}
