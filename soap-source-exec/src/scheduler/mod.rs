//! Single-slot delayed execution for one client.
//!
//! Each scheduler owns one spawned worker that runs jobs strictly one after the
//! other. A job sleeps for its delay, then calls the breaker-wrapped task and
//! hands the result back through a oneshot channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use crate::breaker::{CircuitBreakerTask, PollError};
use crate::invoker::SoapResponse;

/// Extra time a caller waits past the poll interval for a scheduled result.
pub const GRACE_PERIOD: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Execution(#[from] PollError),
    #[error("scheduled poll was interrupted")]
    Interrupted,
    #[error("timed out waiting for scheduled poll")]
    Timeout,
    #[error("scheduler is shut down")]
    Shutdown,
}

type PollResult = Result<SoapResponse, PollError>;

struct Job {
    task: Arc<CircuitBreakerTask>,
    delay: Duration,
    reply: oneshot::Sender<PollResult>,
}

/// Handle to one scheduled invocation.
pub struct ScheduledPoll {
    rx: oneshot::Receiver<PollResult>,
}

pub struct Scheduler {
    name: String,
    jobs: mpsc::UnboundedSender<Job>,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>, handle: &Handle) -> Self {
        let name = name.into();
        let (jobs, rx) = mpsc::unbounded_channel();
        let (shutdown, stop_rx) = watch::channel(false);
        handle.spawn(run(name.clone(), rx, stop_rx));
        Self {
            name,
            jobs,
            shutdown,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn schedule(
        &self,
        task: Arc<CircuitBreakerTask>,
        delay: Duration,
    ) -> Result<ScheduledPoll, SchedulerError> {
        if self.is_shutdown() {
            return Err(SchedulerError::Shutdown);
        }
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job { task, delay, reply })
            .map_err(|_| SchedulerError::Shutdown)?;
        tracing::debug!(scheduler = %self.name, delay_ms = delay.as_millis() as u64, "poll scheduled");
        Ok(ScheduledPoll { rx })
    }

    pub async fn await_result(
        &self,
        poll: ScheduledPoll,
        timeout: Duration,
    ) -> Result<SoapResponse, SchedulerError> {
        match tokio::time::timeout(timeout, poll.rx).await {
            Err(_) => Err(SchedulerError::Timeout),
            Ok(Err(_)) => Err(SchedulerError::Interrupted),
            Ok(Ok(result)) => Ok(result?),
        }
    }

    /// Schedules `task` after `interval` and waits up to `interval + GRACE_PERIOD` for it.
    pub async fn poll(
        &self,
        task: Arc<CircuitBreakerTask>,
        interval: Duration,
    ) -> Result<SoapResponse, SchedulerError> {
        let scheduled = self.schedule(task, interval)?;
        self.await_result(scheduled, interval + GRACE_PERIOD).await
    }

    /// Rejects further scheduling and discards jobs still waiting for their delay.
    /// A call already in flight runs to completion; its result is dropped.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::debug!(scheduler = %self.name, "scheduler shut down");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run(
    name: String,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => break,
            _ = tokio::time::sleep(job.delay) => {}
        }
        let result = job.task.call().await;
        // The caller may have timed out and gone away.
        let _ = job.reply.send(result);
    }
    tracing::debug!(scheduler = %name, "scheduler worker exited");
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
