//! Coalesced progress reporting: `IProgress<T>` → mutex + last-report
//! timestamp, per `spec.md` §9.

use std::time::{Duration, Instant};

use chrono::Utc;
use curio_model::prelude::{JobExecution, JobExecutionId, JobStatus};
use parking_lot::Mutex;

struct ReporterState {
    activity_text: String,
    progress_current: i64,
    progress_total: i64,
    final_text: Option<String>,
    result_schema_version: Option<i32>,
    result_json: Option<String>,
    dirty: bool,
}

/// A snapshot of reportable state, ready to become a partial
/// [`JobExecution`] update.
#[derive(Debug, Clone)]
pub struct ReporterSnapshot {
    pub activity_text: String,
    pub progress_current: i64,
    pub progress_total: i64,
    pub final_text: Option<String>,
    pub result_schema_version: Option<i32>,
    pub result_json: Option<String>,
}

/// Given to a running job. Calls are cheap and non-blocking; the
/// background persistence loop is what actually touches the catalog.
pub struct JobReporter {
    execution_id: JobExecutionId,
    job_key: String,
    job_name: String,
    start_time: chrono::DateTime<Utc>,
    state: Mutex<ReporterState>,
    last_published: Mutex<Instant>,
    min_interval: Duration,
}

impl JobReporter {
    pub fn new(execution_id: JobExecutionId, job_key: String, job_name: String, min_interval: Duration) -> Self {
        Self {
            execution_id,
            job_key,
            job_name,
            start_time: Utc::now(),
            state: Mutex::new(ReporterState {
                activity_text: "Starting...".to_string(),
                progress_current: 0,
                progress_total: 0,
                final_text: None,
                result_schema_version: None,
                result_json: None,
                dirty: true,
            }),
            last_published: Mutex::new(Instant::now()),
            min_interval,
        }
    }

    pub fn execution_id(&self) -> JobExecutionId {
        self.execution_id
    }

    pub fn set_activity(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.activity_text = text.into();
        state.dirty = true;
    }

    pub fn set_progress(&self, current: i64, total: i64) {
        let mut state = self.state.lock();
        state.progress_current = current;
        state.progress_total = total;
        state.dirty = true;
    }

    pub fn clear_progress(&self) {
        self.set_progress(0, 0);
    }

    pub fn set_final_text(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.final_text = Some(text.into());
        state.dirty = true;
    }

    pub fn set_result(&self, schema_version: i32, json: String) {
        let mut state = self.state.lock();
        state.result_schema_version = Some(schema_version);
        state.result_json = Some(json);
        state.dirty = true;
    }

    /// Returns the current state if dirty and the minimum publication
    /// interval has elapsed, marking it published. Used by the service's
    /// ~2s persistence loop.
    pub fn poll(&self) -> Option<ReporterSnapshot> {
        let mut last_published = self.last_published.lock();
        if last_published.elapsed() < self.min_interval {
            return None;
        }
        let snapshot = self.take_if_dirty()?;
        *last_published = Instant::now();
        Some(snapshot)
    }

    /// Forces a publish regardless of dirtiness or interval. Used on
    /// `flush()` and for the terminal write.
    pub fn flush(&self) -> ReporterSnapshot {
        let state = self.state.lock();
        ReporterSnapshot {
            activity_text: state.activity_text.clone(),
            progress_current: state.progress_current,
            progress_total: state.progress_total,
            final_text: state.final_text.clone(),
            result_schema_version: state.result_schema_version,
            result_json: state.result_json.clone(),
        }
    }

    fn take_if_dirty(&self) -> Option<ReporterSnapshot> {
        let mut state = self.state.lock();
        if !state.dirty {
            return None;
        }
        state.dirty = false;
        Some(ReporterSnapshot {
            activity_text: state.activity_text.clone(),
            progress_current: state.progress_current,
            progress_total: state.progress_total,
            final_text: state.final_text.clone(),
            result_schema_version: state.result_schema_version,
            result_json: state.result_json.clone(),
        })
    }

    pub fn to_execution(
        &self,
        snapshot: &ReporterSnapshot,
        status: JobStatus,
        end_time: Option<chrono::DateTime<Utc>>,
        error_message: Option<String>,
    ) -> JobExecution {
        JobExecution {
            id: self.execution_id,
            job_key: self.job_key.clone(),
            job_name: self.job_name.clone(),
            status,
            start_time: self.start_time,
            end_time,
            error_message,
            activity_text: snapshot.activity_text.clone(),
            final_text: snapshot.final_text.clone(),
            progress_current: snapshot.progress_current,
            progress_total: snapshot.progress_total,
            result_schema_version: snapshot.result_schema_version,
            result_json: snapshot.result_json.clone(),
        }
    }
}

impl crate::sync::ScanProgressSink for JobReporter {
    fn set_activity(&self, text: &str) {
        JobReporter::set_activity(self, text.to_string());
    }

    fn report_progress(&self, current: u64, total: u64) {
        self.set_progress(current as i64, total as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_respects_minimum_interval() {
        let reporter = JobReporter::new(
            JobExecutionId::new(),
            "test".to_string(),
            "Test".to_string(),
            Duration::from_secs(3600),
        );
        // Freshly constructed reporters are dirty but `last_published` was
        // just initialized, so the first poll should also wait out the
        // interval.
        assert!(reporter.poll().is_none());
    }

    #[test]
    fn flush_always_returns_current_state_regardless_of_dirty_flag() {
        let reporter = JobReporter::new(
            JobExecutionId::new(),
            "test".to_string(),
            "Test".to_string(),
            Duration::from_millis(0),
        );
        reporter.set_activity("Working");
        let _ = reporter.poll();
        assert_eq!(reporter.flush().activity_text, "Working");
    }
}
