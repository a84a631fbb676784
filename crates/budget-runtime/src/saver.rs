//! Debounced and periodic saving of the latest plan.
//!
//! Every save reads [`LatestSnapshot`] when it fires, never a copy taken
//! when it was scheduled. A newer debounced request supersedes the pending
//! one, and writes are last-write-wins.

use budget_core::Project;
use persistence::{KeyValueStore, PersistenceError, ProjectRepository};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info, warn};

/// Shared handle to the most recent version of the plan.
#[derive(Clone, Debug)]
pub struct LatestSnapshot {
    inner: Arc<RwLock<Project>>,
}

impl LatestSnapshot {
    pub fn new(project: Project) -> Self {
        Self {
            inner: Arc::new(RwLock::new(project)),
        }
    }

    /// Copy of the current plan.
    pub fn read(&self) -> Project {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, project: Project) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = project;
    }

    /// Swap in `f(current)` under one write lock.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Project) -> Project,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let next = f(&guard);
        *guard = next;
    }
}

fn save_latest<S: KeyValueStore>(
    snapshot: &LatestSnapshot,
    repo: &ProjectRepository<S>,
) -> Result<(), PersistenceError> {
    let project = snapshot.read();
    repo.save_project(&project)?;
    debug!(project = %project.id, "plan saved");
    Ok(())
}

/// Schedules saves of a [`LatestSnapshot`] into a repository.
///
/// `request_save` and `spawn_periodic` must be called inside a tokio
/// runtime.
pub struct SaveScheduler<S: KeyValueStore + 'static> {
    snapshot: LatestSnapshot,
    repo: Arc<ProjectRepository<S>>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<S: KeyValueStore + 'static> SaveScheduler<S> {
    pub fn new(
        snapshot: LatestSnapshot,
        repo: Arc<ProjectRepository<S>>,
        debounce: Duration,
    ) -> Self {
        Self {
            snapshot,
            repo,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Save after the debounce period unless a newer request arrives first.
    pub fn request_save(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.snapshot.clone();
        let repo = Arc::clone(&self.repo);
        let current = Arc::clone(&self.generation);
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            sleep(debounce).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = save_latest(&snapshot, &repo) {
                warn!(error = %e, "debounced save failed");
            }
        });
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stale) = pending.replace(handle) {
            stale.abort();
        }
    }

    /// Cancel any pending request and save immediately.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(stale) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            stale.abort();
        }
        save_latest(&self.snapshot, &self.repo)
    }

    /// Save every `period`, starting one period from now.
    pub fn spawn_periodic(&self, period: Duration) -> JoinHandle<()> {
        let snapshot = self.snapshot.clone();
        let repo = Arc::clone(&self.repo);
        info!(period_secs = period.as_secs(), "periodic save started");
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if let Err(e) = save_latest(&snapshot, &repo) {
                    warn!(error = %e, "periodic save failed");
                }
            }
        })
    }
}

impl<S: KeyValueStore + 'static> Drop for SaveScheduler<S> {
    fn drop(&mut self) {
        if let Some(pending) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.abort();
        }
    }
}
