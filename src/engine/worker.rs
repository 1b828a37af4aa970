// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed-size pool of supervised workers.
//!
//! Every worker runs the same watchdog loop:
//!
//! 1. wait up to the idle timeout for the next item on the shared ready
//!    queue; on expiry report `Warning` and wait again
//! 2. exit on the poison item, on a closed queue, or once the build is
//!    cancelled
//! 3. report `Started`, execute the job in its own task, then report
//!    `Green` or `Fatal`
//!
//! A failed job cancels the shared token before its `Fatal` report is sent,
//! so no worker starts another job after a failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::executor::NodeExecutor;
use crate::engine::job::{Job, JobResponse, WorkItem};
use crate::errors::{BuildError, ExecutionError};
use crate::observability::messages::worker::{JobFailed, JobStarted, WorkerIdle, WorkerStopped};
use crate::observability::messages::StructuredLog;

type ReadyQueue = Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>;

/// Handle the scheduler keeps on its workers.
pub(crate) struct WorkerPool {
    ready: mpsc::UnboundedSender<WorkItem>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub(crate) fn spawn(
        count: usize,
        executor: Arc<NodeExecutor>,
        idle_timeout: Duration,
        responses: mpsc::UnboundedSender<JobResponse>,
        cancel: CancellationToken,
    ) -> Self {
        let (ready, queue) = mpsc::unbounded_channel();
        let queue: ReadyQueue = Arc::new(Mutex::new(queue));

        let handles = (0..count)
            .map(|worker_id| {
                let watchdog = Watchdog {
                    worker_id,
                    queue: queue.clone(),
                    responses: responses.clone(),
                    executor: executor.clone(),
                    idle_timeout,
                    cancel: cancel.clone(),
                };
                tokio::spawn(watchdog.run())
            })
            .collect();

        Self {
            ready,
            handles,
            cancel,
        }
    }

    pub(crate) fn dispatch(&self, job: Job) -> Result<(), BuildError> {
        self.ready
            .send(WorkItem::Build(job))
            .map_err(|_| BuildError::WorkersLost)
    }

    /// Stop every worker and wait for it to exit. A running job is allowed
    /// to finish.
    pub(crate) async fn shutdown(self, abort: bool) {
        if abort {
            self.cancel.cancel();
        }
        for _ in 0..self.handles.len() {
            // Workers that already exited have dropped their interest.
            let _ = self.ready.send(WorkItem::Poison);
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("worker task ended abnormally: {}", e);
            }
        }
    }
}

struct Watchdog {
    worker_id: usize,
    queue: ReadyQueue,
    responses: mpsc::UnboundedSender<JobResponse>,
    executor: Arc<NodeExecutor>,
    idle_timeout: Duration,
    cancel: CancellationToken,
}

enum Pull {
    Item(WorkItem),
    Idle,
    Closed,
}

impl Watchdog {
    async fn run(self) {
        let reason = loop {
            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break "cancelled",
                pulled = self.pull() => pulled,
            };

            let job = match pulled {
                Pull::Item(WorkItem::Build(job)) => job,
                Pull::Item(WorkItem::Poison) => break "poisoned",
                Pull::Closed => break "ready queue closed",
                Pull::Idle => {
                    WorkerIdle {
                        worker_id: self.worker_id,
                        waited: self.idle_timeout,
                    }
                    .log();
                    let warning = JobResponse::Warning {
                        worker_id: self.worker_id,
                        message: format!("Job waiter timed out after {:?}", self.idle_timeout),
                    };
                    if self.responses.send(warning).is_err() {
                        break "scheduler gone";
                    }
                    continue;
                }
            };

            if self.cancel.is_cancelled() {
                break "cancelled";
            }
            if !self.execute(job).await {
                break "scheduler gone";
            }
        };

        WorkerStopped {
            worker_id: self.worker_id,
            reason,
        }
        .log();
    }

    async fn pull(&self) -> Pull {
        let next = tokio::time::timeout(self.idle_timeout, async {
            let mut queue = self.queue.lock().await;
            queue.recv().await
        })
        .await;

        match next {
            Ok(Some(item)) => Pull::Item(item),
            Ok(None) => Pull::Closed,
            Err(_) => Pull::Idle,
        }
    }

    /// Run one job and report it. Returns false when the scheduler is gone.
    async fn execute(&self, job: Job) -> bool {
        let target = job.target().clone();
        let rule = job.node.definition().rule.clone();
        let started = JobStarted {
            worker_id: self.worker_id,
            target: &target,
            attempt: job.attempt,
        };
        let span = started.span("job");
        started.log();

        let report = JobResponse::Started {
            worker_id: self.worker_id,
            target: target.clone(),
            attempt: job.attempt,
        };
        if self.responses.send(report).is_err() {
            return false;
        }

        let executor = self.executor.clone();
        let task = tokio::spawn(async move { executor.execute(&job).await }.instrument(span));

        let failure = match task.await {
            Ok(Ok(outcome)) => {
                return self
                    .responses
                    .send(JobResponse::Green {
                        worker_id: self.worker_id,
                        outcome,
                    })
                    .is_ok();
            }
            Ok(Err(e)) => e,
            Err(join) => ExecutionError::RulePanicked {
                target: target.clone(),
                rule,
                message: panic_message(join),
            },
        };

        JobFailed {
            worker_id: self.worker_id,
            target: &target,
            error: &failure,
        }
        .log();

        self.cancel.cancel();
        self.responses
            .send(JobResponse::Fatal {
                worker_id: self.worker_id,
                target: Some(failure.target().cloned().unwrap_or(target)),
                message: failure.to_string(),
            })
            .is_ok()
    }
}

fn panic_message(join: tokio::task::JoinError) -> String {
    match join.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(join) => join.to_string(),
    }
}
