//! The polling task: one client per (request file, topic) pair, driven by the host
//! through `start`, repeated `poll` and `stop`.

mod client;

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use soap_source_core::{ConfigError, Settings, SourceConfig, SourceRecord};
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::breaker::PollError;
use crate::invoker::{HttpClient, HttpError, ReqwestHttpClient};
use crate::scheduler::SchedulerError;
use crate::sink::TaskMetrics;

pub use client::Client;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Stopped,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("task is {actual}, expected {expected}")]
    InvalidState {
        expected: TaskState,
        actual: TaskState,
    },
    #[error("task must be started from within a tokio runtime")]
    Runtime,
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] HttpError),
}

pub struct SourceTask {
    id: Uuid,
    state: TaskState,
    clients: Vec<Client>,
    transport: Option<Arc<dyn HttpClient>>,
    metrics: TaskMetrics,
}

impl Default for SourceTask {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTask {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            state: TaskState::Created,
            clients: Vec::new(),
            transport: None,
            metrics: TaskMetrics::new(id),
        }
    }

    /// Uses `http` for every client instead of a reqwest transport built at start.
    pub fn with_transport(http: Arc<dyn HttpClient>) -> Self {
        Self {
            transport: Some(http),
            ..Self::new()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn metrics(&self) -> &TaskMetrics {
        &self.metrics
    }

    /// Validates `settings` and starts one client per request file.
    /// Nothing is left running when this fails.
    pub fn start(&mut self, settings: &Settings) -> Result<(), TaskError> {
        if self.state != TaskState::Created {
            return Err(TaskError::InvalidState {
                expected: TaskState::Created,
                actual: self.state,
            });
        }
        let handle = Handle::try_current().map_err(|_| TaskError::Runtime)?;
        let config = SourceConfig::from_settings(settings)?;

        let http: Arc<dyn HttpClient> = match &self.transport {
            Some(http) => http.clone(),
            None => Arc::new(ReqwestHttpClient::new(config.endpoint.connection_timeout)?),
        };

        self.clients = config
            .client_configs()
            .into_iter()
            .map(|cc| Client::new(cc, http.clone(), &handle))
            .collect();
        self.state = TaskState::Running;
        self.metrics.start(self.clients.len());

        tracing::info!(
            task_id = %self.id,
            service = %config.endpoint.qualified_service(),
            endpoint = %config.endpoint.endpoint_url,
            clients = self.clients.len(),
            assignment = %config.assignment,
            "source task started"
        );
        Ok(())
    }

    /// Runs one cycle over every client and returns the records it produced, in client order.
    /// Failing clients are logged and skipped.
    pub async fn poll(&mut self) -> Vec<SourceRecord> {
        if self.state != TaskState::Running {
            return Vec::new();
        }
        self.metrics.record_cycle();

        let results = join_all(self.clients.iter().map(|c| c.poll())).await;

        let mut records = Vec::with_capacity(results.len());
        for (client, result) in self.clients.iter().zip(results) {
            let config = client.config();
            let response = match result {
                Ok(response) => response,
                Err(SchedulerError::Execution(PollError::CircuitOpen)) => {
                    self.metrics.record_circuit_open();
                    tracing::warn!(
                        task_id = %self.id,
                        request = %config.source,
                        "circuit open, skipping request"
                    );
                    continue;
                }
                Err(SchedulerError::Timeout) => {
                    self.metrics.record_timeout();
                    tracing::warn!(task_id = %self.id, request = %config.source, "poll timed out");
                    continue;
                }
                Err(e) => {
                    self.metrics.record_poll_failure();
                    tracing::error!(
                        task_id = %self.id,
                        request = %config.source,
                        error = %e,
                        "poll failed"
                    );
                    continue;
                }
            };

            match SourceRecord::from_response(config, &response.body) {
                Ok(record) => {
                    self.metrics.record_record();
                    records.push(record);
                }
                Err(e) => {
                    self.metrics.record_mapping_error();
                    tracing::error!(
                        task_id = %self.id,
                        request = %config.source,
                        error = %e,
                        "failed to map response"
                    );
                }
            }
        }

        tracing::debug!(task_id = %self.id, records = records.len(), "poll cycle finished");
        records
    }

    /// Shuts every client's scheduler down. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.state == TaskState::Stopped {
            return;
        }
        for client in &self.clients {
            client.shutdown();
        }
        self.clients.clear();
        self.state = TaskState::Stopped;
        self.metrics.stop();
        tracing::info!(task_id = %self.id, "source task stopped");
    }
}
