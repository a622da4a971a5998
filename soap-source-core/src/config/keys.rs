//! Setting names and defaults recognized in a settings map.

pub const ENDPOINT_URL: &str = "endpointUrl";
pub const TARGET_NAMESPACE: &str = "targetNameSpace";
pub const SERVICE_NAME: &str = "serviceName";
pub const PORT_NAME: &str = "portName";
pub const SOAP_ACTION: &str = "SOAPAction";
pub const REQUEST_MSG_FILES: &str = "requestMessageFiles";
/// Single-file spelling, accepted when `requestMessageFiles` is absent.
pub const REQUEST_MSG_FILE: &str = "requestMessageFile";
pub const TOPIC: &str = "topic";
pub const TOPIC_PREFIX: &str = "topicPrefix";
pub const REQUEST_TOPIC_ASSIGNMENT: &str = "requestTopicAssignment";
pub const POLL_INTERVAL: &str = "pollInterval";
pub const CONNECTION_TIMEOUT: &str = "connectionTimeOut";
pub const REQUEST_TIMEOUT: &str = "requestTimeOut";

pub const DEFAULT_POLL_INTERVAL_MS: i64 = 6000;
pub const DEFAULT_CONNECTION_TIMEOUT_MS: i64 = 30000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: i64 = 30000;
