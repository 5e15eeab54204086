//! In-process job dispatcher backed by the tokio worker pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FillJob, JobHandle, JobStatus, RepoId};
use crate::domain::ports::JobDispatcher;
use crate::services::cache_coordinator::CacheCoordinator;
use crate::services::query_registry::QueryRegistry;
use crate::services::retry::RetryPolicy;

struct JobEntry {
    job: FillJob,
    signal: watch::Sender<JobStatus>,
}

/// Terminal jobs retained for status lookups before the oldest are pruned.
const MAX_FINISHED_JOBS: usize = 256;

/// Schedules fill jobs onto tokio tasks and tracks their status in an
/// in-process registry.
///
/// Each job wraps `ensure_cached` in the retry policy; every retry is a
/// full fresh invocation. Overlapping jobs for the same repos are allowed
/// to race — the conflict-tolerant cache writes make duplicate work
/// harmless, and the cost of the occasional redundant fetch is accepted in
/// exchange for not holding a cross-process lock.
pub struct LocalDispatcher {
    coordinator: Arc<CacheCoordinator>,
    registry: Arc<QueryRegistry>,
    retry: RetryPolicy,
    jobs: Arc<RwLock<HashMap<JobHandle, JobEntry>>>,
}

impl LocalDispatcher {
    pub fn new(
        coordinator: Arc<CacheCoordinator>,
        registry: Arc<QueryRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            coordinator,
            registry,
            retry,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Remove every terminal job from the registry, returning how many
    /// were dropped. Pending and running jobs are untouched.
    pub async fn reap(&self) -> usize {
        let mut map = self.jobs.write().await;
        let before = map.len();
        map.retain(|_, entry| !entry.job.status.is_terminal());
        before - map.len()
    }

    /// Keep the registry bounded: once more than `MAX_FINISHED_JOBS`
    /// terminal entries accumulate, the oldest-finished are dropped.
    async fn prune_finished(jobs: &RwLock<HashMap<JobHandle, JobEntry>>) {
        let mut map = jobs.write().await;
        let mut finished: Vec<(JobHandle, chrono::DateTime<Utc>)> = map
            .iter()
            .filter(|(_, entry)| entry.job.status.is_terminal())
            .map(|(handle, entry)| {
                (
                    *handle,
                    entry.job.finished_at.unwrap_or(entry.job.created_at),
                )
            })
            .collect();
        if finished.len() <= MAX_FINISHED_JOBS {
            return;
        }
        finished.sort_by_key(|(_, finished_at)| *finished_at);
        for (handle, _) in finished
            .iter()
            .take(finished.len() - MAX_FINISHED_JOBS)
        {
            map.remove(handle);
        }
    }

    async fn set_status(
        jobs: &RwLock<HashMap<JobHandle, JobEntry>>,
        handle: JobHandle,
        status: JobStatus,
        error: Option<String>,
    ) {
        let mut map = jobs.write().await;
        if let Some(entry) = map.get_mut(&handle) {
            entry.job.status = status;
            entry.job.error = error;
            if status.is_terminal() {
                entry.job.finished_at = Some(Utc::now());
            }
            // Receivers may already be gone; that is fine.
            let _ = entry.signal.send(status);
        }
    }
}

#[async_trait]
impl JobDispatcher for LocalDispatcher {
    async fn schedule(&self, query_name: &str, repo_ids: Vec<RepoId>) -> DomainResult<JobHandle> {
        let query = self.registry.require(query_name)?;
        Self::prune_finished(&self.jobs).await;

        let job = FillJob::new(query_name, repo_ids.clone());
        let handle = job.id;
        let (signal, _) = watch::channel(JobStatus::Pending);
        self.jobs
            .write()
            .await
            .insert(handle, JobEntry { job, signal });

        let coordinator = Arc::clone(&self.coordinator);
        let jobs = Arc::clone(&self.jobs);
        let retry = self.retry.clone();
        tokio::spawn(async move {
            Self::set_status(&jobs, handle, JobStatus::Running, None).await;

            let attempts = Arc::new(AtomicU32::new(0));
            let result = retry
                .execute(|| {
                    let coordinator = Arc::clone(&coordinator);
                    let jobs = Arc::clone(&jobs);
                    let attempts = Arc::clone(&attempts);
                    let query = query.clone();
                    let repo_ids = repo_ids.clone();
                    async move {
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                        if attempt > 0 {
                            let mut map = jobs.write().await;
                            if let Some(entry) = map.get_mut(&handle) {
                                entry.job.retries = attempt;
                            }
                        }
                        coordinator.ensure_cached(&query, &repo_ids).await
                    }
                })
                .await;

            match result {
                Ok(outcome) => {
                    info!(job = %handle, ?outcome, "fill job succeeded");
                    Self::set_status(&jobs, handle, JobStatus::Succeeded, None).await;
                }
                Err(err) => {
                    error!(job = %handle, "fill job failed: {err:#}");
                    Self::set_status(&jobs, handle, JobStatus::Failed, Some(format!("{err:#}")))
                        .await;
                }
            }
        });

        Ok(handle)
    }

    async fn status(&self, handle: JobHandle) -> DomainResult<JobStatus> {
        let map = self.jobs.read().await;
        map.get(&handle)
            .map(|entry| entry.job.status)
            .ok_or(DomainError::JobNotFound(handle))
    }

    async fn wait(&self, handle: JobHandle) -> DomainResult<JobStatus> {
        let mut rx = {
            let map = self.jobs.read().await;
            let entry = map.get(&handle).ok_or(DomainError::JobNotFound(handle))?;
            entry.signal.subscribe()
        };

        loop {
            let status = *rx.borrow();
            if status.is_terminal() {
                return Ok(status);
            }
            if rx.changed().await.is_err() {
                // Sender dropped without a terminal status; report the
                // last observed one.
                return Ok(*rx.borrow());
            }
        }
    }

    async fn job(&self, handle: JobHandle) -> DomainResult<FillJob> {
        let map = self.jobs.read().await;
        map.get(&handle)
            .map(|entry| entry.job.clone())
            .ok_or(DomainError::JobNotFound(handle))
    }
}
