pub mod metrics;

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use soap_source_core::SourceRecord;
use tokio::sync::Mutex;

pub use metrics::TaskMetrics;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write records: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination of the records a poll cycle produced.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn deliver(&self, records: &[SourceRecord]) -> Result<(), SinkError>;
}

/// One JSON object per record on stdout.
pub struct StdoutRecordSink;

#[async_trait]
impl RecordSink for StdoutRecordSink {
    async fn deliver(&self, records: &[SourceRecord]) -> Result<(), SinkError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Appends one JSON line per record to a file.
pub struct FileRecordSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl FileRecordSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for FileRecordSink {
    async fn deliver(&self, records: &[SourceRecord]) -> Result<(), SinkError> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        let mut file = self.file.lock().await;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }
}
