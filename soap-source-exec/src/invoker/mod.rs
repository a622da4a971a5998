//! One SOAP call for one (endpoint, request file) pair.

pub mod http;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use soap_source_core::{EndpointDescriptor, RequestSource};

pub use http::{HttpClient, HttpError, ReqwestHttpClient, SoapRequest, SoapResponse};

pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("request payload not found: {}", .path.display())]
    PayloadNotFound { path: PathBuf },
    #[error("failed to read request payload {}: {message}", .path.display())]
    Payload { path: PathBuf, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
}

/// A zero-argument SOAP call.
#[async_trait]
pub trait Invoke: Send + Sync {
    async fn invoke(&self) -> Result<SoapResponse, InvokeError>;
}

pub struct EndpointInvoker {
    endpoint: Arc<EndpointDescriptor>,
    source: RequestSource,
    http: Arc<dyn HttpClient>,
}

impl EndpointInvoker {
    pub fn new(
        endpoint: Arc<EndpointDescriptor>,
        source: RequestSource,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            endpoint,
            source,
            http,
        }
    }

    /// Builds a fresh request. The payload file is read on every call.
    pub fn build_request(&self) -> Result<SoapRequest, InvokeError> {
        let path = self.source.path();
        let body = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => InvokeError::PayloadNotFound {
                path: path.to_path_buf(),
            },
            _ => InvokeError::Payload {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE.to_string());
        if !self.endpoint.action.is_empty() {
            headers.insert("SOAPAction".to_string(), format!("\"{}\"", self.endpoint.action));
        }

        Ok(SoapRequest {
            url: self.endpoint.endpoint_url.clone(),
            headers,
            body,
        })
    }
}

#[async_trait]
impl Invoke for EndpointInvoker {
    async fn invoke(&self) -> Result<SoapResponse, InvokeError> {
        let req = self.build_request()?;
        let resp = self
            .http
            .send(req, self.endpoint.request_timeout)
            .await
            .map_err(|e| match e {
                HttpError::Timeout => InvokeError::Timeout,
                other => InvokeError::Transport(other.to_string()),
            })?;
        if !resp.is_success() {
            // SOAP faults arrive here as HTTP 500.
            return Err(InvokeError::Transport(format!(
                "{} returned HTTP {}",
                self.endpoint.qualified_port(),
                resp.status
            )));
        }
        Ok(resp)
    }
}
