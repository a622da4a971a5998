#![forbid(unsafe_code)]

pub mod assignment;
pub mod config;
pub mod error;
pub mod mapper;
pub mod record;

pub use crate::assignment::{
    assign_channels, Assignment, AssignmentPlan, TopicAssignment, WorkerGroup,
};
pub use crate::config::{
    keys, ClientConfig, EndpointDescriptor, RequestSource, Settings, SourceConfig,
};
pub use crate::error::{ConfigError, MappingError};
pub use crate::mapper::{response_to_json, response_to_value, xml_to_json};
pub use crate::record::{RecordKey, SourceRecord};
