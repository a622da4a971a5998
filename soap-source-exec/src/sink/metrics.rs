use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub task_id: uuid::Uuid,
    pub clients: usize,
    pub started_at: Option<Instant>,
    pub stopped_at: Option<Instant>,
    pub cycles: usize,
    pub records: usize,
    pub poll_failures: usize,
    pub circuit_open: usize,
    pub timeouts: usize,
    pub mapping_errors: usize,
}

impl TaskMetrics {
    pub fn new(task_id: uuid::Uuid) -> Self {
        Self {
            task_id,
            clients: 0,
            started_at: None,
            stopped_at: None,
            cycles: 0,
            records: 0,
            poll_failures: 0,
            circuit_open: 0,
            timeouts: 0,
            mapping_errors: 0,
        }
    }

    pub fn start(&mut self, clients: usize) {
        self.clients = clients;
        self.started_at = Some(Instant::now());
    }

    pub fn record_cycle(&mut self) {
        self.cycles += 1;
    }

    pub fn record_record(&mut self) {
        self.records += 1;
    }

    pub fn record_poll_failure(&mut self) {
        self.poll_failures += 1;
    }

    pub fn record_circuit_open(&mut self) {
        self.circuit_open += 1;
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub fn record_mapping_error(&mut self) {
        self.mapping_errors += 1;
    }

    pub fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    pub fn uptime(&self) -> Option<Duration> {
        let started = self.started_at?;
        Some(match self.stopped_at {
            Some(stopped) => stopped.duration_since(started),
            None => started.elapsed(),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "task_id": self.task_id.to_string(),
            "clients": self.clients,
            "uptime_ms": self.uptime().map(|d| d.as_millis() as u64),
            "cycles": self.cycles,
            "records": self.records,
            "failures": {
                "poll": self.poll_failures,
                "circuit_open": self.circuit_open,
                "timeouts": self.timeouts,
                "mapping": self.mapping_errors,
            },
        })
    }
}
