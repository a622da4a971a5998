use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use soap_source_core::{keys, Settings};
use soap_source_exec::{
    CircuitState, HttpClient, HttpError, SoapRequest, SoapResponse, SourceTask, TaskError,
    TaskState,
};

/// Echoes the request payload back inside a SOAP envelope. Payloads containing
/// `FAIL` get an HTTP 500.
struct EchoHttpClient {
    calls: AtomicUsize,
}

impl EchoHttpClient {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl HttpClient for EchoHttpClient {
    async fn send(&self, req: SoapRequest, _timeout: Duration) -> Result<SoapResponse, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload = String::from_utf8_lossy(&req.body).into_owned();
        if payload.contains("FAIL") {
            return Ok(SoapResponse {
                status: 500,
                headers: BTreeMap::new(),
                body: b"<Fault/>".to_vec(),
            });
        }
        let body = format!(
            "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\"><s:Body>{payload}</s:Body></s:Envelope>"
        );
        Ok(SoapResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: body.into_bytes(),
        })
    }
}

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

fn settings(files: &[String]) -> Settings {
    let mut s = Settings::new();
    s.insert(keys::ENDPOINT_URL.into(), "http://orders.local/ws".into());
    s.insert(keys::TARGET_NAMESPACE.into(), "urn:orders".into());
    s.insert(keys::SERVICE_NAME.into(), "OrderService".into());
    s.insert(keys::PORT_NAME.into(), "OrderPort".into());
    s.insert(keys::REQUEST_MSG_FILES.into(), files.join(","));
    s.insert(keys::TOPIC.into(), "orders".into());
    s.insert(keys::POLL_INTERVAL.into(), "1000".into());
    s.insert(keys::CONNECTION_TIMEOUT.into(), "100".into());
    s
}

#[tokio::test(start_paused = true)]
async fn start_then_stop_leaves_nothing_running() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "GetOrder.xml", "<GetOrder/>");
    let http = EchoHttpClient::new();
    let mut task = SourceTask::with_transport(http.clone());

    task.start(&settings(&[file])).unwrap();
    assert_eq!(task.state(), TaskState::Running);
    assert_eq!(task.clients().len(), 1);

    task.stop();
    assert_eq!(task.state(), TaskState::Stopped);
    assert!(task.clients().is_empty());
    task.stop();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    assert!(task.poll().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn poll_produces_records_in_client_order() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write(dir.path(), "GetOrder.xml", "<GetOrder><id>1</id></GetOrder>"),
        write(dir.path(), "ListOrders.xml", "<ListOrders><page>2</page></ListOrders>"),
    ];
    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    task.start(&settings(&files)).unwrap();

    let records = task.poll().await;
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].channel, "ordersGetOrder.xml");
    assert_eq!(
        records[0].key,
        r#"{"serviceName":"OrderService","requestType":"GetOrder"}"#
    );
    assert_eq!(records[0].value, r#"{"GetOrder":{"id":"1"}}"#);

    assert_eq!(records[1].channel, "ordersListOrders.xml");
    assert_eq!(
        records[1].key,
        r#"{"serviceName":"OrderService","requestType":"ListOrders"}"#
    );
    assert_eq!(records[1].value, r#"{"ListOrders":{"page":"2"}}"#);

    let metrics = task.metrics();
    assert_eq!(metrics.cycles, 1);
    assert_eq!(metrics.records, 2);
    task.stop();
}

#[tokio::test(start_paused = true)]
async fn failing_clients_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write(dir.path(), "Good.xml", "<Good/>"),
        write(dir.path(), "Bad.xml", "<FAIL/>"),
        dir.path().join("Missing.xml").display().to_string(),
        write(dir.path(), "NotXml.xml", "plain text"),
        write(dir.path(), "AlsoGood.xml", "<AlsoGood/>"),
    ];
    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    task.start(&settings(&files)).unwrap();

    let records = task.poll().await;
    let channels: Vec<&str> = records.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(channels, vec!["ordersGood.xml", "ordersAlsoGood.xml"]);

    let metrics = task.metrics();
    assert_eq!(metrics.poll_failures, 2);
    assert_eq!(metrics.mapping_errors, 1);
    task.stop();
}

#[tokio::test(start_paused = true)]
async fn open_breaker_skips_the_client() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write(dir.path(), "Bad.xml", "<FAIL/>")];
    let mut s = settings(&files);
    s.insert(keys::POLL_INTERVAL.into(), "5000".into());
    s.insert(keys::CONNECTION_TIMEOUT.into(), "1000".into());
    let http = EchoHttpClient::new();
    let mut task = SourceTask::with_transport(http.clone());
    task.start(&s).unwrap();

    for _ in 0..3 {
        assert!(task.poll().await.is_empty());
    }
    assert_eq!(task.clients()[0].breaker_state().await, CircuitState::Open);

    for _ in 0..7 {
        assert!(task.poll().await.is_empty());
    }
    assert_eq!(http.calls.load(Ordering::SeqCst), 3);
    assert_eq!(task.metrics().poll_failures, 3);
    assert_eq!(task.metrics().circuit_open, 7);
    task.stop();
}

#[tokio::test(start_paused = true)]
async fn breaker_window_covers_slow_polls() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write(dir.path(), "Bad.xml", "<FAIL/>")];
    let mut s = settings(&files);
    s.insert(keys::POLL_INTERVAL.into(), "600000".into());
    s.insert(keys::CONNECTION_TIMEOUT.into(), "10".into());
    let http = EchoHttpClient::new();
    let mut task = SourceTask::with_transport(http.clone());
    task.start(&s).unwrap();

    for _ in 0..4 {
        assert!(task.poll().await.is_empty());
    }
    assert_eq!(task.clients()[0].breaker_state().await, CircuitState::Open);
    assert_eq!(http.calls.load(Ordering::SeqCst), 3);
    task.stop();
}

#[tokio::test(start_paused = true)]
async fn payload_edits_apply_on_next_poll() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "GetOrder.xml", "<GetOrder><id>1</id></GetOrder>");
    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    task.start(&settings(&[file.clone()])).unwrap();

    assert_eq!(task.poll().await[0].value, r#"{"GetOrder":{"id":"1"}}"#);
    std::fs::write(&file, "<GetOrder><id>2</id></GetOrder>").unwrap();
    assert_eq!(task.poll().await[0].value, r#"{"GetOrder":{"id":"2"}}"#);
    task.stop();
}

#[tokio::test(start_paused = true)]
async fn invalid_settings_fail_start() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "GetOrder.xml", "<GetOrder/>");
    let mut s = settings(&[file]);
    s.insert(keys::CONNECTION_TIMEOUT.into(), "1000".into());

    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    let err = task.start(&s).unwrap_err();
    assert!(matches!(err, TaskError::Config(_)), "{err}");
    assert_eq!(task.state(), TaskState::Created);
    assert!(task.clients().is_empty());
}

#[tokio::test(start_paused = true)]
async fn relative_request_file_fails_start() {
    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    let err = task
        .start(&settings(&["relative/GetOrder.xml".to_string()]))
        .unwrap_err();
    assert!(matches!(err, TaskError::Config(_)), "{err}");
}

#[tokio::test(start_paused = true)]
async fn start_is_only_allowed_once() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(&[write(dir.path(), "GetOrder.xml", "<GetOrder/>")]);
    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    task.start(&s).unwrap();

    let err = task.start(&s).unwrap_err();
    assert!(matches!(
        err,
        TaskError::InvalidState {
            expected: TaskState::Created,
            actual: TaskState::Running
        }
    ));

    task.stop();
    assert!(matches!(task.start(&s), Err(TaskError::InvalidState { .. })));
}

#[test]
fn start_outside_runtime_is_rejected() {
    let mut task = SourceTask::with_transport(EchoHttpClient::new());
    let err = task.start(&Settings::new()).unwrap_err();
    assert!(matches!(err, TaskError::Runtime));
}
