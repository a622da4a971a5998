#![forbid(unsafe_code)]

//! Runtime engine for scheduled, circuit-broken SOAP polling.
//!
//! Settings parsing, topic assignment and response mapping live in `soap-source-core`.

pub mod breaker;
pub mod connector;
pub mod invoker;
pub mod scheduler;
pub mod sink;
pub mod task;

pub use crate::breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerTask, CircuitState, PollError,
};
pub use crate::connector::{ConnectorError, SoapSourceConnector};
pub use crate::invoker::{
    EndpointInvoker, HttpClient, HttpError, Invoke, InvokeError, ReqwestHttpClient, SoapRequest,
    SoapResponse,
};
pub use crate::scheduler::{ScheduledPoll, Scheduler, SchedulerError, GRACE_PERIOD};
pub use crate::sink::{FileRecordSink, RecordSink, SinkError, StdoutRecordSink, TaskMetrics};
pub use crate::task::{Client, SourceTask, TaskError, TaskState};
