use soap_source_core::{keys, ConfigError, Settings, SourceConfig, TopicAssignment};

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("connector has not been started")]
    NotStarted,
}

/// Validates the source settings and splits them into per-task settings.
#[derive(Default)]
pub struct SoapSourceConnector {
    started: Option<(Settings, SourceConfig)>,
}

impl SoapSourceConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `settings` exactly as a task would at start.
    pub fn start(&mut self, settings: Settings) -> Result<(), ConnectorError> {
        let config = SourceConfig::from_settings(&settings)?;
        tracing::info!(
            files = config.request_files.len(),
            assignment = %config.assignment,
            "connector started"
        );
        self.started = Some((settings, config));
        Ok(())
    }

    pub fn config(&self) -> Option<&SourceConfig> {
        self.started.as_ref().map(|(_, config)| config)
    }

    /// One settings map per worker group. Each map is a complete task configuration
    /// covering exactly that group's request files.
    pub fn task_configs(&self, max_tasks: usize) -> Result<Vec<Settings>, ConnectorError> {
        let (settings, config) = self.started.as_ref().ok_or(ConnectorError::NotStarted)?;
        let plan = config.plan(max_tasks)?;

        let configs = plan
            .groups
            .iter()
            .map(|group| {
                let mut task = settings.clone();
                task.remove(keys::REQUEST_MSG_FILE);
                let files: Vec<String> = group.files().map(|f| f.to_string()).collect();
                task.insert(keys::REQUEST_MSG_FILES.to_string(), files.join(", "));
                if plan.strategy == TopicAssignment::CustomAssignment {
                    // Raw names; the prefix is still applied by the task.
                    let topics: Vec<&str> = group
                        .assignments
                        .iter()
                        .map(|a| config.topics[a.index].as_str())
                        .collect();
                    task.insert(keys::TOPIC.to_string(), topics.join(", "));
                }
                task
            })
            .collect();
        Ok(configs)
    }

    pub fn stop(&mut self) {
        if self.started.take().is_some() {
            tracing::info!("connector stopped");
        }
    }
}
