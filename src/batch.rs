use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::ExportError;

/// Configuration for batch processing
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Files processed at once
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// A file that could not be processed
#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: ExportError,
}

/// Per-file results of a batch, in input order
#[derive(Debug)]
pub struct BatchReport<T> {
    pub completed: Vec<(PathBuf, T)>,
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Run `job` over every path on a bounded pool of blocking workers
///
/// Each file is independent; a failing file is recorded and the rest carry
/// on. Results come back in the order of `paths`.
pub async fn run_batch<T, F>(paths: Vec<PathBuf>, config: &BatchConfig, job: F) -> BatchReport<T>
where
    T: Send + 'static,
    F: Fn(&Path) -> Result<T, ExportError> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let permits = Arc::new(Semaphore::new(config.jobs.max(1)));
    let mut workers = JoinSet::new();

    for (index, path) in paths.into_iter().enumerate() {
        let job = Arc::clone(&job);
        let permits = Arc::clone(&permits);

        workers.spawn(async move {
            // Held until the blocking work is done; the semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            let worker_path = path.clone();
            let result = tokio::task::spawn_blocking(move || job(&worker_path))
                .await
                .map_err(ExportError::from)
                .and_then(|r| r);
            (index, path, result)
        });
    }

    let mut completed = Vec::new();
    let mut failed = Vec::new();

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((index, path, Ok(value))) => {
                debug!("Finished {:?}", path);
                completed.push((index, path, value));
            }
            Ok((index, path, Err(error))) => {
                warn!("Failed {:?}: {}", path, error);
                failed.push((index, BatchFailure { path, error }));
            }
            Err(e) => warn!("Batch worker aborted: {}", e),
        }
    }

    completed.sort_by_key(|(index, _, _)| *index);
    failed.sort_by_key(|(index, _)| *index);

    BatchReport {
        completed: completed
            .into_iter()
            .map(|(_, path, value)| (path, value))
            .collect(),
        failed: failed.into_iter().map(|(_, failure)| failure).collect(),
    }
}
