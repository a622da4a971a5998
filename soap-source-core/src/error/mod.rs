use thiserror::Error;

use crate::assignment::TopicAssignment;

/// Invalid or missing settings. Always surfaced at start, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting `{key}`")]
    Missing { key: &'static str },
    #[error("invalid value {value:?} for `{key}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("request file {path:?} must be an absolute path")]
    RelativeRequestFile { path: String },
    #[error(
        "unknown request topic assignment {0:?} (expected ONE_TOPIC, TOPIC_PER_REQUEST or CUSTOM_ASSIGNMENT)"
    )]
    UnknownAssignment(String),
    #[error("{strategy} takes exactly one topic name, got {count}")]
    SingleTopicExpected {
        strategy: TopicAssignment,
        count: usize,
    },
    #[error("CUSTOM_ASSIGNMENT needs one topic per request file ({files} files, {topics} topics)")]
    TopicCountMismatch { files: usize, topics: usize },
    #[error("connection timeout ({connection_ms} ms) must be less than the poll interval ({poll_ms} ms)")]
    ConnectionTimeoutTooLong { connection_ms: u64, poll_ms: u64 },
    #[error("worker count must be at least 1")]
    NoWorkers,
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// A successful response that could not be turned into a record.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("response is not well-formed XML: {0}")]
    Malformed(String),
    #[error("response document has no root element")]
    NoRootElement,
    #[error("SOAP envelope has no body content")]
    EmptyBody,
    #[error("failed to serialize response document: {0}")]
    Serialize(String),
    #[error("failed to encode record as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
