use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use soap_source_core::{EndpointDescriptor, RequestSource};
use soap_source_exec::{
    EndpointInvoker, HttpClient, HttpError, Invoke, InvokeError, SoapRequest, SoapResponse,
};

struct MockHttpClient {
    status: u16,
    fail_with: Option<HttpError>,
    seen: Mutex<Vec<(SoapRequest, Duration)>>,
}

impl MockHttpClient {
    fn ok() -> Arc<Self> {
        Self::with_status(200)
    }

    fn with_status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            fail_with: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: HttpError) -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            fail_with: Some(err),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(SoapRequest, Duration)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: SoapRequest, timeout: Duration) -> Result<SoapResponse, HttpError> {
        self.seen.lock().unwrap().push((req, timeout));
        if let Some(ref err) = self.fail_with {
            return Err(err.clone());
        }
        Ok(SoapResponse {
            status: self.status,
            headers: BTreeMap::new(),
            body: b"<Ok/>".to_vec(),
        })
    }
}

fn endpoint(action: &str) -> Arc<EndpointDescriptor> {
    Arc::new(EndpointDescriptor {
        namespace: "urn:orders".into(),
        service_name: "OrderService".into(),
        port_name: "OrderPort".into(),
        endpoint_url: url::Url::parse("http://orders.local/ws").unwrap(),
        action: action.into(),
        connection_timeout: Duration::from_millis(1000),
        request_timeout: Duration::from_millis(2500),
    })
}

fn payload(dir: &tempfile::TempDir, name: &str, body: &str) -> RequestSource {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    RequestSource::new(path).unwrap()
}

#[tokio::test]
async fn posts_payload_with_soap_headers() {
    let dir = tempfile::tempdir().unwrap();
    let http = MockHttpClient::ok();
    let invoker = EndpointInvoker::new(
        endpoint("urn:GetOrder"),
        payload(&dir, "GetOrder.xml", "<Envelope/>"),
        http.clone(),
    );

    let resp = invoker.invoke().await.unwrap();
    assert_eq!(resp.body, b"<Ok/>");

    let seen = http.requests();
    assert_eq!(seen.len(), 1);
    let (req, timeout) = &seen[0];
    assert_eq!(req.url.as_str(), "http://orders.local/ws");
    assert_eq!(req.body, b"<Envelope/>");
    assert_eq!(req.headers["Content-Type"], "text/xml; charset=utf-8");
    assert_eq!(req.headers["SOAPAction"], "\"urn:GetOrder\"");
    assert_eq!(*timeout, Duration::from_millis(2500));
}

#[tokio::test]
async fn empty_action_sends_no_soap_action_header() {
    let dir = tempfile::tempdir().unwrap();
    let http = MockHttpClient::ok();
    let invoker =
        EndpointInvoker::new(endpoint(""), payload(&dir, "Ping.xml", "<Ping/>"), http.clone());

    invoker.invoke().await.unwrap();
    assert!(!http.requests()[0].0.headers.contains_key("SOAPAction"));
}

#[tokio::test]
async fn payload_is_reread_on_every_call() {
    let dir = tempfile::tempdir().unwrap();
    let http = MockHttpClient::ok();
    let source = payload(&dir, "GetOrder.xml", "<v1/>");
    let invoker = EndpointInvoker::new(endpoint(""), source.clone(), http.clone());

    invoker.invoke().await.unwrap();
    std::fs::write(source.path(), "<v2/>").unwrap();
    invoker.invoke().await.unwrap();

    let bodies: Vec<Vec<u8>> = http.requests().into_iter().map(|(r, _)| r.body).collect();
    assert_eq!(bodies, vec![b"<v1/>".to_vec(), b"<v2/>".to_vec()]);
}

#[tokio::test]
async fn missing_payload_is_reported_without_calling_transport() {
    let dir = tempfile::tempdir().unwrap();
    let http = MockHttpClient::ok();
    let source = RequestSource::new(dir.path().join("Missing.xml")).unwrap();
    let invoker = EndpointInvoker::new(endpoint(""), source, http.clone());

    let err = invoker.invoke().await.unwrap_err();
    assert!(matches!(err, InvokeError::PayloadNotFound { .. }));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let invoker = EndpointInvoker::new(
        endpoint(""),
        payload(&dir, "GetOrder.xml", "<x/>"),
        MockHttpClient::with_status(500),
    );

    let err = invoker.invoke().await.unwrap_err();
    assert!(matches!(err, InvokeError::Transport(ref m) if m.contains("500")), "{err}");
}

#[tokio::test]
async fn transport_failures_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let source = payload(&dir, "GetOrder.xml", "<x/>");

    let timeout = EndpointInvoker::new(
        endpoint(""),
        source.clone(),
        MockHttpClient::failing(HttpError::Timeout),
    );
    assert!(matches!(timeout.invoke().await.unwrap_err(), InvokeError::Timeout));

    let network = EndpointInvoker::new(
        endpoint(""),
        source,
        MockHttpClient::failing(HttpError::Network("connection refused".into())),
    );
    assert!(matches!(network.invoke().await.unwrap_err(), InvokeError::Transport(_)));
}
