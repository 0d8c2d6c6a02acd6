//! The cron-driven dispatcher: seeds default schedules, polls every 30s,
//! and starts due jobs through the [`JobService`]. See `spec.md` §4.10.

mod cron_preview;

pub use cron_preview::{preview_cron, CronPreview};

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use curio_contracts::error::Result;

use crate::catalog::ports::ScheduleRepository;
use crate::jobs::{JobKey, JobMode, JobService};

const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// The default cron table seeded at startup if a row for the job is not
/// already present. All default schedules start disabled: an operator
/// opts in explicitly, matching the teacher's posture of never silently
/// enabling background work the first time a process boots.
pub const DEFAULT_SCHEDULES: &[(JobKey, &str, bool)] = &[
    (crate::jobs::SCAN_ALL_LIBRARIES, "0 */6 * * *", false),
    (crate::jobs::GENERATE_THUMBNAILS, "30 * * * *", false),
    (crate::jobs::FIND_DUPLICATES, "0 3 * * 0", false),
];

/// Normalizes a standard 5-field cron expression (minute hour
/// day-of-month month day-of-week) into the 6-field form the `cron` crate
/// requires (seconds first) by prefixing a fixed `0` seconds field.
fn parse_standard_cron(expression: &str) -> std::result::Result<Schedule, cron::error::Error> {
    let with_seconds = format!("0 {expression}");
    Schedule::from_str(&with_seconds)
}

/// A single background service polling for due schedules and dispatching
/// them through the job service.
pub struct Scheduler {
    job_service: Arc<JobService>,
    schedules: Arc<dyn ScheduleRepository>,
}

impl Scheduler {
    pub fn new(job_service: Arc<JobService>, schedules: Arc<dyn ScheduleRepository>) -> Self {
        Self { job_service, schedules }
    }

    /// Seeds the default schedule table. Idempotent: rows already present
    /// (by job name) are left untouched. Runs the legacy-name migration
    /// first so a seeded default never collides with a not-yet-migrated
    /// row for the same job.
    pub async fn seed_defaults(&self) -> Result<()> {
        self.migrate_legacy_job_names().await?;
        for (key, expr, enabled) in DEFAULT_SCHEDULES {
            self.schedules.seed_if_missing(key.0, expr, *enabled).await?;
        }
        Ok(())
    }

    /// Migrates rows whose `job_name` holds a human display name (e.g.
    /// `"Scan all libraries"`) left over from before the move to stable
    /// `JobKey`s, per `spec.md` §4.10. Rows already keyed correctly are
    /// left untouched; rows matching neither a key nor a known display
    /// name are left for `tick`'s unknown-job handling to disable.
    async fn migrate_legacy_job_names(&self) -> Result<()> {
        for schedule in self.schedules.list_all().await? {
            if self.job_service.resolve_key(&schedule.job_name).is_some() {
                continue;
            }
            if let Some(key) = self.job_service.resolve_key_by_display_name(&schedule.job_name) {
                info!(from = %schedule.job_name, to = %key, "migrating scheduled job row from display name to stable key");
                self.schedules.rename_job(schedule.id, key.0).await?;
            }
        }
        Ok(())
    }

    /// Runs the 30-second poll loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "scheduler tick failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// One poll: loads due schedules, resolves each against the job
    /// registry, starts it, and recomputes `next_run`.
    async fn tick(&self) -> Result<()> {
        let now = Utc::now();
        let due = self.schedules.list_due(now).await?;

        for schedule in due {
            let Some(key) = self.job_service.resolve_key(&schedule.job_name) else {
                warn!(job_name = %schedule.job_name, "scheduled job references unknown job key, disabling");
                self.schedules.set_enabled(schedule.id, false).await?;
                continue;
            };

            match self.job_service.start_job(key, JobMode::Missing).await {
                Ok(_) => {
                    let next_run = match parse_standard_cron(&schedule.cron_expression) {
                        Ok(parsed) => parsed.after(&now).next(),
                        Err(e) => {
                            warn!(job_name = %schedule.job_name, error = %e, "invalid cron expression on scheduled job");
                            None
                        }
                    };
                    if let Some(next_run) = next_run {
                        self.schedules.record_run(schedule.id, now, next_run).await?;
                    }
                }
                Err(e) => {
                    // Leave `next_run` unchanged so the next poll retries;
                    // most commonly this is `Conflict` because the job is
                    // already running from a manual trigger.
                    warn!(job_name = %schedule.job_name, error = %e, "scheduled job failed to start, will retry next poll");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedules_use_recognized_job_keys() {
        for (key, expr, _) in DEFAULT_SCHEDULES {
            assert!(!key.0.is_empty());
            assert!(parse_standard_cron(expr).is_ok(), "expression {expr:?} should parse");
        }
    }

    #[test]
    fn every_six_hours_expression_parses() {
        assert!(parse_standard_cron("0 */6 * * *").is_ok());
    }

    // tick() is private, so exercising it against a real due schedule has
    // to happen in-module rather than from tests/. Fakes, not mockall: the
    // repositories here hold just enough state for the dispatch decision.

    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use curio_model::prelude::{JobExecutionId, ScheduledJob, ScheduledJobId};

    use crate::catalog::ports::JobExecutionRepository;
    use crate::jobs::{Job, JobContext};

    #[derive(Default)]
    struct FakeScheduleRepository {
        rows: StdMutex<Vec<ScheduledJob>>,
        disabled: StdMutex<Vec<ScheduledJobId>>,
        recorded_runs: StdMutex<Vec<(ScheduledJobId, chrono::DateTime<Utc>)>>,
    }

    #[async_trait]
    impl ScheduleRepository for FakeScheduleRepository {
        async fn seed_if_missing(&self, _job_name: &str, _cron_expression: &str, _is_enabled: bool) -> Result<()> {
            Ok(())
        }

        async fn get_by_job_name(&self, job_name: &str) -> Result<Option<ScheduledJob>> {
            Ok(self.rows.lock().unwrap().iter().find(|r| r.job_name == job_name).cloned())
        }

        async fn list_all(&self) -> Result<Vec<ScheduledJob>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn list_due(&self, now: chrono::DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.is_enabled && r.next_run.map(|n| n <= now).unwrap_or(true))
                .cloned()
                .collect())
        }

        async fn record_run(&self, id: ScheduledJobId, last_run: chrono::DateTime<Utc>, next_run: chrono::DateTime<Utc>) -> Result<()> {
            self.recorded_runs.lock().unwrap().push((id, next_run));
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.last_run = Some(last_run);
                row.next_run = Some(next_run);
            }
            Ok(())
        }

        async fn set_enabled(&self, id: ScheduledJobId, is_enabled: bool) -> Result<()> {
            if !is_enabled {
                self.disabled.lock().unwrap().push(id);
            }
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.is_enabled = is_enabled;
            }
            Ok(())
        }

        async fn rename_job(&self, id: ScheduledJobId, job_name: &str) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.job_name = job_name.to_string();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeJobExecutionRepository {
        executions: StdMutex<Vec<curio_model::prelude::JobExecution>>,
    }

    #[async_trait]
    impl JobExecutionRepository for FakeJobExecutionRepository {
        async fn create_execution(&self, execution: &curio_model::prelude::JobExecution) -> Result<()> {
            self.executions.lock().unwrap().push(execution.clone());
            Ok(())
        }

        async fn update_execution(&self, execution: &curio_model::prelude::JobExecution) -> Result<()> {
            let mut executions = self.executions.lock().unwrap();
            if let Some(existing) = executions.iter_mut().find(|e| e.id == execution.id) {
                *existing = execution.clone();
            }
            Ok(())
        }

        async fn get_execution(&self, id: JobExecutionId) -> Result<Option<curio_model::prelude::JobExecution>> {
            Ok(self.executions.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }

        async fn list_history(&self, _job_key: Option<&str>, _offset: i64, _limit: i64) -> Result<Vec<curio_model::prelude::JobExecution>> {
            Ok(self.executions.lock().unwrap().clone())
        }

        async fn set_status(&self, _id: JobExecutionId, _status: curio_model::prelude::JobStatus) -> Result<()> {
            Ok(())
        }
    }

    /// Completes instantly, recording that it ran.
    struct InstantJob {
        ran: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl Job for InstantJob {
        fn key(&self) -> JobKey {
            crate::jobs::SCAN_ALL_LIBRARIES
        }
        fn name(&self) -> &str {
            "Scan all libraries"
        }
        fn description(&self) -> &str {
            "test job"
        }
        fn display_order(&self) -> i32 {
            0
        }
        fn supports_all_mode(&self) -> bool {
            false
        }
        async fn execute(&self, _ctx: JobContext) -> Result<()> {
            self.ran.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn tick_starts_a_due_schedule_and_advances_next_run() {
        let schedule_id = ScheduledJobId::new();
        let schedules = Arc::new(FakeScheduleRepository {
            rows: StdMutex::new(vec![ScheduledJob {
                id: schedule_id,
                job_name: crate::jobs::SCAN_ALL_LIBRARIES.0.to_string(),
                cron_expression: "*/5 * * * *".to_string(),
                is_enabled: true,
                last_run: None,
                next_run: None,
            }]),
            ..Default::default()
        });

        let job_service = JobService::new(Arc::new(FakeJobExecutionRepository::default()), Duration::from_secs(3600));
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        job_service.register(Arc::new(InstantJob { ran: ran.clone() }));

        let scheduler = Scheduler::new(job_service, schedules.clone());
        scheduler.tick().await.unwrap();

        // Give the spawned job task a moment to actually run to completion.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(schedules.recorded_runs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tick_disables_a_schedule_referencing_an_unknown_job() {
        let schedule_id = ScheduledJobId::new();
        let schedules = Arc::new(FakeScheduleRepository {
            rows: StdMutex::new(vec![ScheduledJob {
                id: schedule_id,
                job_name: "not-a-registered-job".to_string(),
                cron_expression: "*/5 * * * *".to_string(),
                is_enabled: true,
                last_run: None,
                next_run: None,
            }]),
            ..Default::default()
        });

        let job_service = JobService::new(Arc::new(FakeJobExecutionRepository::default()), Duration::from_secs(3600));
        let scheduler = Scheduler::new(job_service, schedules.clone());
        scheduler.tick().await.unwrap();

        assert_eq!(*schedules.disabled.lock().unwrap(), vec![schedule_id]);
    }

    #[tokio::test]
    async fn seed_defaults_migrates_a_row_keyed_by_legacy_display_name() {
        let schedule_id = ScheduledJobId::new();
        let schedules = Arc::new(FakeScheduleRepository {
            rows: StdMutex::new(vec![ScheduledJob {
                id: schedule_id,
                job_name: "Scan all libraries".to_string(),
                cron_expression: "0 */6 * * *".to_string(),
                is_enabled: true,
                last_run: None,
                next_run: None,
            }]),
            ..Default::default()
        });

        let job_service = JobService::new(Arc::new(FakeJobExecutionRepository::default()), Duration::from_secs(3600));
        job_service.register(Arc::new(InstantJob {
            ran: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }));

        let scheduler = Scheduler::new(job_service, schedules.clone());
        scheduler.seed_defaults().await.unwrap();

        let migrated = schedules
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == schedule_id)
            .unwrap()
            .job_name
            .clone();
        assert_eq!(migrated, crate::jobs::SCAN_ALL_LIBRARIES.0);

        // Re-seeding is idempotent: the row is already keyed correctly, so
        // a second pass leaves it alone rather than re-migrating it.
        scheduler.seed_defaults().await.unwrap();
        assert_eq!(schedules.rows.lock().unwrap().len(), 1);
        let still = schedules.rows.lock().unwrap()[0].job_name.clone();
        assert_eq!(still, crate::jobs::SCAN_ALL_LIBRARIES.0);
    }

    #[tokio::test]
    async fn seed_defaults_leaves_a_row_matching_no_key_or_display_name_alone() {
        let schedule_id = ScheduledJobId::new();
        let schedules = Arc::new(FakeScheduleRepository {
            rows: StdMutex::new(vec![ScheduledJob {
                id: schedule_id,
                job_name: "some long-deleted job".to_string(),
                cron_expression: "0 */6 * * *".to_string(),
                is_enabled: true,
                last_run: None,
                next_run: None,
            }]),
            ..Default::default()
        });

        let job_service = JobService::new(Arc::new(FakeJobExecutionRepository::default()), Duration::from_secs(3600));
        let scheduler = Scheduler::new(job_service, schedules.clone());
        scheduler.seed_defaults().await.unwrap();

        let untouched = schedules
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == schedule_id)
            .unwrap()
            .job_name
            .clone();
        assert_eq!(untouched, "some long-deleted job");
    }
}
