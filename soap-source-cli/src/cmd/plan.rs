use soap_source_core::SourceConfig;

use crate::cmd::config::load_settings;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{ConfigArgs, OutputArgs, WorkerArgs};

pub async fn plan_cmd(config: ConfigArgs, workers: WorkerArgs, output: OutputArgs) -> i32 {
    let settings = match load_settings(&config, &output) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let plan = match SourceConfig::from_settings(&settings).and_then(|c| c.plan(workers.workers)) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("validation failed: {e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    if output.format == OutputFormat::Text {
        if !output.quiet {
            println!(
                "{} worker(s), strategy {}",
                plan.len(),
                plan.strategy
            );
            for group in &plan.groups {
                println!("worker {}:", group.worker);
                for a in &group.assignments {
                    println!("  {} -> {}", a.source, a.channel);
                }
            }
        }
    } else {
        print_result(output.format, output.quiet, &plan);
    }
    exit_codes::SUCCESS
}
