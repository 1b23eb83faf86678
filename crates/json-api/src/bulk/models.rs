//! Bulk job wire models.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use sublet_app::domain::bulk::job::{BulkFailure, BulkJob};

use crate::timestamps::utc_opt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct FailureItem {
    pub key: String,
    pub error: String,
}

impl From<&BulkFailure> for FailureItem {
    fn from(failure: &BulkFailure) -> Self {
        Self {
            key: failure.key.clone(),
            error: failure.error.clone(),
        }
    }
}

/// Bulk job snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct JobResponse {
    /// Null before any job has been started
    pub id: Option<String>,

    /// One of `idle`, `running`, `completed`, `error`
    pub status: String,

    pub error: Option<String>,
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FailureItem>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

impl From<&BulkJob> for JobResponse {
    fn from(job: &BulkJob) -> Self {
        Self {
            id: job.id.map(|id| id.to_string()),
            status: job.status.as_str().to_owned(),
            error: job.error.clone(),
            total: job.total,
            completed: job.completed,
            succeeded: job.succeeded,
            failed: job.failed,
            failures: job.failures.iter().map(FailureItem::from).collect(),
            started_at: utc_opt(job.started_at),
            ended_at: utc_opt(job.ended_at),
        }
    }
}
