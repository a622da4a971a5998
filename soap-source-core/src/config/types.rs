use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

/// Identity and timeouts of one remote service. Shared by every client that targets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub namespace: String,
    pub service_name: String,
    pub port_name: String,
    pub endpoint_url: url::Url,
    /// Empty when no action should be sent.
    pub action: String,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
}

impl EndpointDescriptor {
    /// `{namespace}service`, the qualified service name.
    pub fn qualified_service(&self) -> String {
        format!("{{{}}}{}", self.namespace, self.service_name)
    }

    /// `{namespace}port`, the qualified port name.
    pub fn qualified_port(&self) -> String {
        format!("{{{}}}{}", self.namespace, self.port_name)
    }
}

/// Absolute path to a canonical request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestSource {
    path: PathBuf,
}

impl RequestSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ConfigError::RelativeRequestFile {
                path: path.display().to_string(),
            });
        }
        Ok(Self { path })
    }

    /// Parses a comma separated list, trimming each entry.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ConfigError> {
        raw.split(',').map(|f| Self::new(f.trim())).collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including its extension.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name up to its last `.`; `GetOrder.xml` is request type `GetOrder`.
    pub fn request_type(&self) -> String {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => name,
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Everything one client needs. Built once at start and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: Arc<EndpointDescriptor>,
    pub source: RequestSource,
    pub channel: String,
    pub poll_interval: Duration,
    pub connection_timeout: Duration,
}
