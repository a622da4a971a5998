pub mod keys;
mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub use types::{ClientConfig, EndpointDescriptor, RequestSource};

use crate::assignment::{assign_channels, Assignment, AssignmentPlan, TopicAssignment};
use crate::error::ConfigError;

/// String-keyed settings as handed over by the hosting framework.
pub type Settings = BTreeMap<String, String>;

/// Validated source configuration. One flat struct; per-client configs are derived from it.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoint: Arc<EndpointDescriptor>,
    pub request_files: Vec<RequestSource>,
    pub topics: Vec<String>,
    pub topic_prefix: String,
    pub assignment: TopicAssignment,
    pub poll_interval: Duration,
    assignments: Vec<Assignment>,
}

impl SourceConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let endpoint_url = required(settings, keys::ENDPOINT_URL)?;
        let endpoint_url = url::Url::parse(endpoint_url)
            .map_err(|e| ConfigError::invalid(keys::ENDPOINT_URL, endpoint_url, e.to_string()))?;
        let namespace = required(settings, keys::TARGET_NAMESPACE)?.to_string();
        let service_name = required(settings, keys::SERVICE_NAME)?.to_string();
        let port_name = required(settings, keys::PORT_NAME)?.to_string();
        let action = optional(settings, keys::SOAP_ACTION).unwrap_or_default().to_string();

        let files = optional(settings, keys::REQUEST_MSG_FILES)
            .or_else(|| optional(settings, keys::REQUEST_MSG_FILE))
            .ok_or(ConfigError::Missing {
                key: keys::REQUEST_MSG_FILES,
            })?;
        let request_files = RequestSource::parse_list(files)?;

        let topics = parse_topics(required(settings, keys::TOPIC)?)?;
        let topic_prefix = optional(settings, keys::TOPIC_PREFIX).unwrap_or_default().to_string();
        let assignment = match optional(settings, keys::REQUEST_TOPIC_ASSIGNMENT) {
            Some(raw) => raw.parse()?,
            None => TopicAssignment::default(),
        };

        let poll_ms = positive_millis(settings, keys::POLL_INTERVAL, keys::DEFAULT_POLL_INTERVAL_MS)?;
        let connection_ms = positive_millis(
            settings,
            keys::CONNECTION_TIMEOUT,
            keys::DEFAULT_CONNECTION_TIMEOUT_MS,
        )?;
        let request_ms =
            positive_millis(settings, keys::REQUEST_TIMEOUT, keys::DEFAULT_REQUEST_TIMEOUT_MS)?;
        // An in-flight call must never outlive its own polling cadence.
        if connection_ms >= poll_ms {
            return Err(ConfigError::ConnectionTimeoutTooLong {
                connection_ms,
                poll_ms,
            });
        }

        let assignments = assign_channels(&request_files, &topics, assignment, &topic_prefix)?;

        Ok(Self {
            endpoint: Arc::new(EndpointDescriptor {
                namespace,
                service_name,
                port_name,
                endpoint_url,
                action,
                connection_timeout: Duration::from_millis(connection_ms),
                request_timeout: Duration::from_millis(request_ms),
            }),
            request_files,
            topics,
            topic_prefix,
            assignment,
            poll_interval: Duration::from_millis(poll_ms),
            assignments,
        })
    }

    /// `(file, channel)` pairs in request-file order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// One config per `(file, channel)` pair, in request-file order.
    pub fn client_configs(&self) -> Vec<ClientConfig> {
        self.assignments
            .iter()
            .map(|a| ClientConfig {
                endpoint: self.endpoint.clone(),
                source: a.source.clone(),
                channel: a.channel.clone(),
                poll_interval: self.poll_interval,
                connection_timeout: self.endpoint.connection_timeout,
            })
            .collect()
    }

    /// Round-robin partition of the assignments over `min(workers, files)` groups.
    pub fn plan(&self, workers: usize) -> Result<AssignmentPlan, ConfigError> {
        AssignmentPlan::build(&self.assignments, self.assignment, workers)
    }
}

fn optional<'a>(settings: &'a Settings, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(settings: &'a Settings, key: &'static str) -> Result<&'a str, ConfigError> {
    optional(settings, key).ok_or(ConfigError::Missing { key })
}

fn positive_millis(settings: &Settings, key: &'static str, default: i64) -> Result<u64, ConfigError> {
    let value = match optional(settings, key) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::invalid(key, raw, e.to_string()))?,
        None => default,
    };
    if value <= 0 {
        return Err(ConfigError::invalid(key, value.to_string(), "must be greater than 0"));
    }
    Ok(value as u64)
}

fn parse_topics(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(|t| {
            let t = t.trim();
            if t.is_empty() {
                Err(ConfigError::invalid(keys::TOPIC, raw, "topic names must not be empty"))
            } else {
                Ok(t.to_string())
            }
        })
        .collect()
}
