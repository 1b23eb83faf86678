//! Single-flight bulk provisioning of pool keys.

use std::{fmt, sync::Arc};

use jiff::Timestamp;
use mockall::automock;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, error, info};

use crate::domain::{
    bulk::{
        errors::BulkJobError,
        job::{BulkFailure, BulkJob, BulkJobStart, BulkJobStatus, BulkJobUuid},
    },
    pool_keys::PoolKeysService,
};

/// Largest batch accepted after normalisation.
pub const MAX_BULK_ITEMS: usize = 5000;

/// Alias applied to created keys when none is given.
pub const DEFAULT_BULK_ALIAS: &str = "Default";

#[automock]
/// Bulk pool key provisioning.
pub trait BulkJobService: Send + Sync {
    /// Start provisioning `items`, or report the job already running.
    ///
    /// # Errors
    ///
    /// Fails when no items remain after normalisation, or too many do.
    fn start(
        &self,
        items: Vec<String>,
        alias: String,
        total_quota: i32,
    ) -> Result<BulkJobStart, BulkJobError>;

    /// A copy of the current job, or the idle placeholder.
    fn snapshot(&self) -> BulkJob;
}

type JobSlot = Arc<Mutex<Option<BulkJob>>>;

#[derive(Clone)]
pub struct BulkJobManager {
    pool_keys: Arc<dyn PoolKeysService>,
    job: JobSlot,
}

impl fmt::Debug for BulkJobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkJobManager")
            .field("job", &self.job.lock().as_ref().map(|job| job.status))
            .finish_non_exhaustive()
    }
}

impl BulkJobManager {
    #[must_use]
    pub fn new(pool_keys: Arc<dyn PoolKeysService>) -> Self {
        Self {
            pool_keys,
            job: Arc::new(Mutex::new(None)),
        }
    }
}

impl BulkJobService for BulkJobManager {
    fn start(
        &self,
        items: Vec<String>,
        alias: String,
        total_quota: i32,
    ) -> Result<BulkJobStart, BulkJobError> {
        let items = normalize_items(items);

        if items.is_empty() {
            return Err(BulkJobError::NoItems);
        }

        if items.len() > MAX_BULK_ITEMS {
            return Err(BulkJobError::TooLarge {
                count: items.len(),
                limit: MAX_BULK_ITEMS,
            });
        }

        let alias = match alias.trim() {
            "" => DEFAULT_BULK_ALIAS.to_string(),
            trimmed => trimmed.to_string(),
        };

        let id = BulkJobUuid::new();

        let job = {
            let mut slot = self.job.lock();

            if let Some(current) = slot.as_ref().filter(|job| job.is_running()) {
                return Ok(BulkJobStart {
                    job: current.clone(),
                    already_running: true,
                });
            }

            let job = BulkJob::running(id, items.len(), Timestamp::now());

            *slot = Some(job.clone());

            job
        };

        info!(job = %id, total = items.len(), %alias, "bulk provisioning started");

        let worker = tokio::spawn(run_job(
            self.pool_keys.clone(),
            self.job.clone(),
            id,
            items,
            alias,
            total_quota,
        ));

        let slot = self.job.clone();

        tokio::spawn(async move {
            if let Err(join_error) = worker.await {
                error!(job = %id, error = %join_error, "bulk provisioning aborted");

                update_if_current(&slot, id, |job| {
                    job.status = BulkJobStatus::Error;
                    job.error = Some(join_error.to_string());
                    job.ended_at = Some(Timestamp::now());
                });
            }
        });

        Ok(BulkJobStart {
            job,
            already_running: false,
        })
    }

    fn snapshot(&self) -> BulkJob {
        self.job.lock().clone().unwrap_or_else(BulkJob::idle)
    }
}

async fn run_job(
    pool_keys: Arc<dyn PoolKeysService>,
    slot: JobSlot,
    id: BulkJobUuid,
    items: Vec<String>,
    alias: String,
    total_quota: i32,
) {
    for item in items {
        let outcome = pool_keys.create(&item, &alias, total_quota).await;

        let current = update_if_current(&slot, id, |job| {
            job.completed += 1;

            match outcome {
                Ok(_) => job.succeeded += 1,
                Err(error) => {
                    job.failed += 1;
                    job.failures.push(BulkFailure {
                        key: item,
                        error: error.to_string(),
                    });
                }
            }
        });

        if !current {
            debug!(job = %id, "bulk provisioning superseded, abandoning");

            return;
        }
    }

    update_if_current(&slot, id, |job| {
        job.status = BulkJobStatus::Completed;
        job.ended_at = Some(Timestamp::now());

        info!(
            job = %id,
            succeeded = job.succeeded,
            failed = job.failed,
            "bulk provisioning completed"
        );
    });
}

/// Apply `update` only while `id` is still the job in `slot`.
fn update_if_current(
    slot: &Mutex<Option<BulkJob>>,
    id: BulkJobUuid,
    update: impl FnOnce(&mut BulkJob),
) -> bool {
    let mut guard = slot.lock();

    match guard.as_mut().filter(|job| job.id == Some(id)) {
        Some(job) => {
            update(job);
            true
        }
        None => false,
    }
}

/// Trim, drop blanks and de-duplicate, keeping first-seen order.
#[must_use]
pub fn normalize_items(items: Vec<String>) -> Vec<String> {
    let mut seen = FxHashSet::default();

    items
        .into_iter()
        .filter_map(|item| {
            let trimmed = item.trim();

            (!trimmed.is_empty() && seen.insert(trimmed.to_string())).then(|| trimmed.to_string())
        })
        .collect()
}
