use std::sync::Arc;

use soap_source_core::ClientConfig;
use tokio::runtime::Handle;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerTask, CircuitState};
use crate::invoker::{EndpointInvoker, HttpClient, Invoke, SoapResponse};
use crate::scheduler::{Scheduler, SchedulerError};

/// One request file polled on its own scheduler, behind its own breaker.
pub struct Client {
    config: ClientConfig,
    task: Arc<CircuitBreakerTask>,
    scheduler: Scheduler,
}

impl Client {
    pub fn new(config: ClientConfig, http: Arc<dyn HttpClient>, handle: &Handle) -> Self {
        let invoker = EndpointInvoker::new(config.endpoint.clone(), config.source.clone(), http);
        Self::with_invoker(config, Arc::new(invoker), handle)
    }

    pub fn with_invoker(config: ClientConfig, invoker: Arc<dyn Invoke>, handle: &Handle) -> Self {
        let label = format!("{}:{}", config.endpoint.service_name, config.source.file_name());
        let breaker = CircuitBreaker::new(
            label.clone(),
            CircuitBreakerConfig::for_client(config.connection_timeout, config.poll_interval),
        );
        Self {
            task: Arc::new(CircuitBreakerTask::new(invoker, breaker)),
            scheduler: Scheduler::new(label, handle),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn breaker_state(&self) -> CircuitState {
        self.task.breaker().state().await
    }

    pub async fn poll(&self) -> Result<SoapResponse, SchedulerError> {
        self.scheduler
            .poll(self.task.clone(), self.config.poll_interval)
            .await
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
