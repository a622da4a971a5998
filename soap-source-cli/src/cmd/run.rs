use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use soap_source_exec::{
    FileRecordSink, RecordSink, SoapSourceConnector, SourceTask, StdoutRecordSink, TaskError,
};

use crate::cmd::config::load_settings;
use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{ConfigArgs, OutputArgs, WorkerArgs};

#[derive(Serialize)]
struct RunSummary {
    cycles: usize,
    records: usize,
    tasks: Vec<serde_json::Value>,
}

pub async fn run_cmd(
    config: ConfigArgs,
    workers: WorkerArgs,
    cycles: Option<usize>,
    out: Option<PathBuf>,
    output: OutputArgs,
) -> i32 {
    let settings = match load_settings(&config, &output) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut connector = SoapSourceConnector::new();
    let task_configs = match connector
        .start(settings)
        .and_then(|()| connector.task_configs(workers.workers))
    {
        Ok(c) => c,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("validation failed: {e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let sink: Arc<dyn RecordSink> = match &out {
        Some(path) => match FileRecordSink::open(path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                print_error(output.format, output.quiet, &e.to_string());
                return exit_codes::RUNTIME_ERROR;
            }
        },
        None => Arc::new(StdoutRecordSink),
    };

    let mut tasks = Vec::with_capacity(task_configs.len());
    for task_config in &task_configs {
        let mut task = SourceTask::new();
        if let Err(e) = task.start(task_config) {
            stop_all(&mut tasks);
            print_error(output.format, output.quiet, &e.to_string());
            return match e {
                TaskError::Config(_) => exit_codes::VALIDATION_FAILED,
                _ => exit_codes::RUNTIME_ERROR,
            };
        }
        tasks.push(task);
    }

    let mut completed = 0usize;
    let mut produced = 0usize;
    let mut code = exit_codes::SUCCESS;
    while cycles.map_or(true, |max| completed < max) {
        let batches = tokio::select! {
            batches = join_all(tasks.iter_mut().map(|t| t.poll())) => batches,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break;
            }
        };
        completed += 1;

        for records in batches {
            produced += records.len();
            if let Err(e) = sink.deliver(&records).await {
                print_error(output.format, output.quiet, &e.to_string());
                code = exit_codes::RUN_FAILED;
                break;
            }
        }
        if code != exit_codes::SUCCESS {
            break;
        }
    }

    stop_all(&mut tasks);
    connector.stop();

    let summary = RunSummary {
        cycles: completed,
        records: produced,
        tasks: tasks.iter().map(|t| t.metrics().to_json()).collect(),
    };
    tracing::info!(cycles = completed, records = produced, "run finished");
    // Stdout carries the records unless they go to a file.
    if out.is_some() {
        print_result(output.format, output.quiet, &summary);
    }
    code
}

fn stop_all(tasks: &mut [SourceTask]) {
    for task in tasks {
        task.stop();
    }
}
