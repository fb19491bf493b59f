//! Bounded worker pool for pipeline runs
//!
//! Admission order: a core worker if one is free, then a backlog slot
//! (the task parks until a core worker frees up), then a burst worker,
//! and when everything is saturated the work runs on the caller's own
//! task so submissions degrade to synchronous instead of being dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use taro_common::config::PipelineConfig;

/// How a submitted run was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Core,
    Queued,
    Burst,
    CallerRan,
}

pub struct WorkerPool {
    core: Arc<Semaphore>,
    burst: Arc<Semaphore>,
    backlog: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl WorkerPool {
    pub fn new(config: &PipelineConfig) -> Self {
        let burst_workers = config.max_workers.saturating_sub(config.core_workers);
        Self {
            core: Arc::new(Semaphore::new(config.core_workers)),
            burst: Arc::new(Semaphore::new(burst_workers)),
            backlog: Arc::new(Semaphore::new(config.queue_capacity)),
            tracker: TaskTracker::new(),
        }
    }

    /// Admit and run a pipeline future
    pub async fn run<F>(&self, fut: F) -> Admission
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(permit) = Arc::clone(&self.core).try_acquire_owned() {
            self.tracker.spawn(async move {
                let _permit = permit;
                fut.await;
            });
            return Admission::Core;
        }

        if let Ok(slot) = Arc::clone(&self.backlog).try_acquire_owned() {
            let core = Arc::clone(&self.core);
            self.tracker.spawn(async move {
                // Hold the backlog slot only while waiting for a core worker.
                let permit = match core.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return,
                };
                drop(slot);
                let _permit = permit;
                fut.await;
            });
            return Admission::Queued;
        }

        if let Ok(permit) = Arc::clone(&self.burst).try_acquire_owned() {
            self.tracker.spawn(async move {
                let _permit = permit;
                fut.await;
            });
            return Admission::Burst;
        }

        warn!("Worker pool saturated, running pipeline on the submitting task");
        fut.await;
        Admission::CallerRan
    }

    /// Stop accepting work and wait up to `grace` for in-flight runs
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => info!("Worker pool drained"),
            Err(_) => warn!(
                remaining = self.tracker.len(),
                "Worker pool drain timed out, abandoning in-flight runs"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::watch;

    fn pool(core: usize, max: usize, queue: usize) -> WorkerPool {
        WorkerPool::new(&PipelineConfig {
            core_workers: core,
            max_workers: max,
            queue_capacity: queue,
            call_timeout_secs: 30,
            shutdown_grace_secs: 5,
        })
    }

    fn gated_task(
        mut gate: watch::Receiver<bool>,
        counter: Arc<AtomicUsize>,
    ) -> impl Future<Output = ()> + Send + 'static {
        async move {
            while !*gate.borrow() {
                if gate.changed().await.is_err() {
                    break;
                }
            }
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn admission_escalates_core_queue_burst_caller() {
        let pool = pool(1, 2, 1);
        let (open, gate) = watch::channel(false);
        let done = Arc::new(AtomicUsize::new(0));

        let a = pool.run(gated_task(gate.clone(), done.clone())).await;
        let b = pool.run(gated_task(gate.clone(), done.clone())).await;
        let c = pool.run(gated_task(gate.clone(), done.clone())).await;
        assert_eq!(a, Admission::Core);
        assert_eq!(b, Admission::Queued);
        assert_eq!(c, Admission::Burst);

        // Everything full: this one runs inline, so it must not block.
        let inline_done = done.clone();
        let d = pool
            .run(async move {
                inline_done.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(d, Admission::CallerRan);
        assert_eq!(done.load(Ordering::SeqCst), 1);

        open.send(true).unwrap();
        pool.shutdown(Duration::from_secs(5)).await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn queued_work_runs_after_core_frees_up() {
        let pool = pool(1, 1, 2);
        let (open, gate) = watch::channel(false);
        let done = Arc::new(AtomicUsize::new(0));

        assert_eq!(
            pool.run(gated_task(gate.clone(), done.clone())).await,
            Admission::Core
        );
        assert_eq!(
            pool.run(gated_task(gate.clone(), done.clone())).await,
            Admission::Queued
        );
        assert_eq!(
            pool.run(gated_task(gate.clone(), done.clone())).await,
            Admission::Queued
        );

        open.send(true).unwrap();
        pool.shutdown(Duration::from_secs(5)).await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn shutdown_times_out_on_stuck_work() {
        let pool = pool(1, 1, 0);
        assert_eq!(
            pool.run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .await,
            Admission::Core
        );
        tokio::time::timeout(
            Duration::from_secs(2),
            pool.shutdown(Duration::from_millis(50)),
        )
        .await
        .expect("shutdown respects its grace period");
    }
}
