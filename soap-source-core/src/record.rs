use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::MappingError;
use crate::mapper;

/// Key of every record a client produces. Derived from the client config, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub service_name: String,
    pub request_type: String,
}

impl RecordKey {
    pub fn for_client(config: &ClientConfig) -> Self {
        Self {
            service_name: config.endpoint.service_name.clone(),
            request_type: config.source.request_type(),
        }
    }

    pub fn to_json(&self) -> Result<String, MappingError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One mapped response, ready for the downstream framework to transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub channel: String,
    /// `{"serviceName":…,"requestType":…}`
    pub key: String,
    /// JSON mirror of the response payload.
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

impl SourceRecord {
    /// Maps a raw response of the client described by `config`.
    pub fn from_response(config: &ClientConfig, body: &[u8]) -> Result<Self, MappingError> {
        let key = RecordKey::for_client(config).to_json()?;
        let value = mapper::response_to_json(body)?;
        Ok(Self {
            channel: config.channel.clone(),
            key,
            value,
            timestamp: Utc::now(),
        })
    }
}
