//! Bounded worker pool. A task running on the pool must be able to submit more work to that same
//! pool without deadlocking, so queuing is decoupled from execution: `submit` always spawns
//! immediately, and only the task body waits on a semaphore permit. That way an already-running
//! task on a saturated pool can still enqueue more work instead of blocking forever.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::TaskFailure;

#[derive(Clone)]
pub struct TaskPool {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    errors: Arc<AtomicUsize>,
}

impl TaskPool {
    pub fn new(name: &'static str, workers: usize) -> Self {
        Self {
            name,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            errors: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn submit<F, Fut>(&self, task: F) -> JoinHandle<Result<(), TaskFailure>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let errors = Arc::clone(&self.errors);
        let name = self.name;

        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("task pool semaphore is never closed");
            let result = task().await;
            if let Err(ref failure) = result {
                errors.fetch_add(1, Ordering::Relaxed);
                warn!(pool = name, %failure, "task failed");
            }
            result
        })
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[tokio::test]
    async fn saturated_pool_does_not_deadlock_on_self_submission() {
        let pool = TaskPool::new("test", 1);
        let inner_pool = pool.clone();

        let handle = pool.submit(move || async move {
            // This pool has exactly one permit, already held by this very task. Submitting
            // another task to the same pool must not block waiting for a free worker to spawn.
            let child = inner_pool.submit(|| async { Ok(()) });
            child.await.unwrap().unwrap();
            Ok(())
        });

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "self-submission deadlocked");
    }

    #[tokio::test]
    async fn failed_task_increments_error_count_without_aborting_pool() {
        let pool = TaskPool::new("test", 2);
        let failing = pool.submit(|| async {
            Err(TaskFailure::new("a.jpg", ErrorKind::LocalIO("disk full".into())))
        });
        let succeeding = pool.submit(|| async { Ok(()) });

        let _ = failing.await.unwrap();
        succeeding.await.unwrap().unwrap();

        assert_eq!(pool.error_count(), 1);
    }
}
