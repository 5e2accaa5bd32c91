//! Bounded in-process worker pool.
//!
//! A fixed number of workers drain one bounded queue. Tasks are lost on
//! server restart.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};

use feedline_core::ports::{OverflowPolicy, PoolError, PoolStats, Task, TaskPool};

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Maximum number of queued tasks.
    pub queue_capacity: usize,
    /// Behaviour when the queue is full.
    pub overflow: OverflowPolicy,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 10_000,
            overflow: OverflowPolicy::Block,
        }
    }
}

impl WorkerPoolConfig {
    /// Load `POOL_<NAME>_WORKERS`, `POOL_<NAME>_QUEUE_CAPACITY` and
    /// `POOL_<NAME>_OVERFLOW`, falling back to `defaults`.
    pub fn from_env(name: &str, defaults: Self) -> Self {
        let prefix = format!("POOL_{}", name.to_ascii_uppercase());
        let overflow = match std::env::var(format!("{prefix}_OVERFLOW")) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(pool = name, error = %e, "Invalid overflow policy, using default");
                defaults.overflow
            }),
            Err(_) => defaults.overflow,
        };

        Self {
            workers: std::env::var(format!("{prefix}_WORKERS"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.workers),
            queue_capacity: std::env::var(format!("{prefix}_QUEUE_CAPACITY"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.queue_capacity),
            overflow,
        }
    }
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    processing: AtomicUsize,
    completed: AtomicUsize,
    rejected: AtomicUsize,
}

/// Bounded task pool. Workers are spawned on construction, so it must be
/// created inside a Tokio runtime.
pub struct BoundedTaskPool {
    name: String,
    overflow: OverflowPolicy,
    counters: Arc<Counters>,
    sender: mpsc::Sender<Task>,
}

impl BoundedTaskPool {
    pub fn new(name: impl Into<String>, config: WorkerPoolConfig) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Task>(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        for worker_id in 0..config.workers.max(1) {
            let receiver = receiver.clone();
            let counters = counters.clone();
            let pool = name.clone();

            tokio::spawn(async move {
                tracing::debug!(pool = %pool, worker = worker_id, "Worker started");

                loop {
                    let task = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };

                    let Some(task) = task else {
                        tracing::debug!(pool = %pool, worker = worker_id, "Worker shutting down");
                        break;
                    };

                    counters.pending.fetch_sub(1, Ordering::Relaxed);
                    counters.processing.fetch_add(1, Ordering::Relaxed);

                    if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                        tracing::error!(pool = %pool, worker = worker_id, "Task panicked");
                    }

                    counters.processing.fetch_sub(1, Ordering::Relaxed);
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        tracing::info!(
            pool = %name,
            workers = config.workers.max(1),
            capacity = config.queue_capacity.max(1),
            overflow = ?config.overflow,
            "Worker pool started"
        );

        Self {
            name,
            overflow: config.overflow,
            counters,
            sender: tx,
        }
    }

    /// Pool named `name` configured from `POOL_<NAME>_*` variables.
    pub fn from_env(name: &str) -> Self {
        Self::new(name, WorkerPoolConfig::from_env(name, WorkerPoolConfig::default()))
    }
}

#[async_trait]
impl TaskPool for BoundedTaskPool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, task: Task) -> Result<(), PoolError> {
        self.counters.pending.fetch_add(1, Ordering::Relaxed);

        let result = match self.overflow {
            OverflowPolicy::Block => self
                .sender
                .send(task)
                .await
                .map_err(|_| PoolError::Closed(self.name.clone())),
            OverflowPolicy::Reject => self.sender.try_send(task).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    PoolError::QueueFull(self.name.clone())
                }
                mpsc::error::TrySendError::Closed(_) => PoolError::Closed(self.name.clone()),
            }),
        };

        if result.is_err() {
            self.counters.pending.fetch_sub(1, Ordering::Relaxed);
        }
        result
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            pending: self.counters.pending.load(Ordering::Relaxed),
            processing: self.counters.processing.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn wait_until(pool: &BoundedTaskPool, done: impl Fn(&PoolStats) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done(&pool.stats()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pool did not reach expected state");
    }

    fn single_worker(overflow: OverflowPolicy) -> BoundedTaskPool {
        BoundedTaskPool::new(
            "test",
            WorkerPoolConfig {
                workers: 1,
                queue_capacity: 1,
                overflow,
            },
        )
    }

    #[tokio::test]
    async fn test_runs_submitted_tasks() {
        let pool = BoundedTaskPool::new("test", WorkerPoolConfig::default());
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let hits = hits.clone();
            pool.submit(Box::pin(async move {
                hits.fetch_add(1, Ordering::Relaxed);
            }))
            .await
            .unwrap();
        }

        wait_until(&pool, |s| s.completed == 10).await;
        assert_eq!(hits.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn test_reject_policy_fails_when_full() {
        let pool = single_worker(OverflowPolicy::Reject);
        let (release, gate) = oneshot::channel::<()>();

        pool.submit(Box::pin(async move {
            let _ = gate.await;
        }))
        .await
        .unwrap();
        wait_until(&pool, |s| s.processing == 1).await;

        pool.submit(Box::pin(async {})).await.unwrap();
        let overflow = pool.submit(Box::pin(async {})).await;

        assert!(matches!(overflow, Err(PoolError::QueueFull(_))));
        assert_eq!(pool.stats().rejected, 1);

        release.send(()).unwrap();
        wait_until(&pool, |s| s.completed == 2).await;
    }

    #[tokio::test]
    async fn test_block_policy_waits_for_slot() {
        let pool = Arc::new(single_worker(OverflowPolicy::Block));
        let (release, gate) = oneshot::channel::<()>();

        pool.submit(Box::pin(async move {
            let _ = gate.await;
        }))
        .await
        .unwrap();
        wait_until(&pool, |s| s.processing == 1).await;
        pool.submit(Box::pin(async {})).await.unwrap();

        let blocked = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.submit(Box::pin(async {})).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        release.send(()).unwrap();
        blocked.await.unwrap().unwrap();
        wait_until(&pool, |s| s.completed == 3).await;
        assert_eq!(pool.stats().rejected, 0);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_kill_worker() {
        let pool = single_worker(OverflowPolicy::Block);

        pool.submit(Box::pin(async { panic!("boom") })).await.unwrap();
        pool.submit(Box::pin(async {})).await.unwrap();

        wait_until(&pool, |s| s.completed == 2).await;
    }
}
