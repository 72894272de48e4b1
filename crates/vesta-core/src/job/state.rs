//! Job records and the job-status store abstraction.
//!
//! The store is injected into the orchestrator rather than held as
//! process-wide state; external cancellation requests and the running job
//! are the only writers, one at a time, last write wins.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::analysis::SetStatistics;
use crate::quality::{MasterStats, QualityScore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Cancelled,
    Failed,
    Success,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed | Self::Success)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// One input frame the validator turned away, with its reasons.
#[derive(Clone, Debug, Serialize)]
pub struct RejectedFrame {
    pub name: String,
    pub reasons: Vec<String>,
}

/// Result block of a finished (or failed) job.
#[derive(Clone, Debug, Default, Serialize)]
pub struct JobResult {
    pub preview_path: Option<String>,
    /// Attached after success by the deferred raw-artifact upload.
    pub master_path: Option<String>,
    pub used: usize,
    pub rejected: usize,
    pub rejected_details: Vec<RejectedFrame>,
    pub method: Option<String>,
    pub n_frames: usize,
    pub stats: Option<MasterStats>,
    pub quality: Option<QualityScore>,
    pub dark_scale: Option<f32>,
}

/// Non-fatal findings accumulated across the pipeline.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub set_stats: Option<SetStatistics>,
    pub recommendation: Option<String>,
    pub frame_type: Option<String>,
}

/// Persisted job state. Terminal statuses are absorbing; the only write
/// allowed afterwards is result enrichment that keeps the status.
#[derive(Clone, Debug, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    /// 0..=100
    pub progress: u8,
    pub error: Option<String>,
    pub result: Option<JobResult>,
    pub diagnostics: Diagnostics,
}

impl JobRecord {
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0,
            error: None,
            result: None,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Job-status store consumed by the orchestrator and by cancellation
/// endpoints.
pub trait JobStore: Send + Sync {
    /// Insert or replace a record. Stores must refuse to move a record
    /// out of a terminal status; writes that keep the status (result
    /// enrichment) are allowed.
    fn upsert(&self, record: JobRecord);

    fn get(&self, id: &str) -> Option<JobRecord>;

    /// Status-only transition, same terminal-state rules as `upsert`.
    fn set_status(&self, id: &str, status: JobStatus);
}

/// Mutex-guarded map store for tests, the CLI, and single-process
/// deployments.
#[derive(Default)]
pub struct InMemoryJobStore {
    records: Mutex<HashMap<String, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn upsert(&self, record: JobRecord) {
        let mut records = self.records.lock().expect("job store poisoned");
        if let Some(existing) = records.get(&record.id) {
            if existing.status.is_terminal() && record.status != existing.status {
                return;
            }
        }
        records.insert(record.id.clone(), record);
    }

    fn get(&self, id: &str) -> Option<JobRecord> {
        self.records
            .lock()
            .expect("job store poisoned")
            .get(id)
            .cloned()
    }

    fn set_status(&self, id: &str, status: JobStatus) {
        let mut records = self.records.lock().expect("job store poisoned");
        if let Some(record) = records.get_mut(id) {
            if record.status.is_terminal() {
                return;
            }
            record.status = status;
        }
    }
}
