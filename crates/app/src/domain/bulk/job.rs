//! Bulk Job Snapshots

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Bulk Job UUID
pub type BulkJobUuid = TypedUuid<BulkJob>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkJobStatus {
    Idle,
    Running,
    Completed,
    Error,
}

impl BulkJobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// One item the pool rejected, with the reason verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub key: String,
    pub error: String,
}

/// Point-in-time copy of the bulk provisioning job.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkJob {
    /// `None` only for the idle placeholder.
    pub id: Option<BulkJobUuid>,
    pub status: BulkJobStatus,

    /// Set when the job itself could not run to completion.
    pub error: Option<String>,

    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailure>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}

impl BulkJob {
    /// Placeholder reported before any job has been started.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            id: None,
            status: BulkJobStatus::Idle,
            error: None,
            total: 0,
            completed: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }

    pub(crate) fn running(id: BulkJobUuid, total: usize, started_at: Timestamp) -> Self {
        Self {
            id: Some(id),
            status: BulkJobStatus::Running,
            total,
            started_at: Some(started_at),
            ..Self::idle()
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == BulkJobStatus::Running
    }
}

/// Result of asking for a job to start.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkJobStart {
    pub job: BulkJob,

    /// True when `job` is a previously started job that is still running.
    pub already_running: bool,
}
