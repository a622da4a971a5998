use serde::Serialize;
use soap_source_core::SourceConfig;

use crate::cmd::config::load_settings;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::redact_url_password;
use crate::{ConfigArgs, OutputArgs};

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    clients: Vec<ClientSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

#[derive(Serialize)]
struct ClientSummary {
    request: String,
    request_type: String,
    channel: String,
}

pub async fn validate_cmd(config: ConfigArgs, output: OutputArgs) -> i32 {
    let settings = match load_settings(&config, &output) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match SourceConfig::from_settings(&settings) {
        Ok(cfg) => {
            let clients: Vec<ClientSummary> = cfg
                .client_configs()
                .into_iter()
                .map(|c| ClientSummary {
                    request: c.source.to_string(),
                    request_type: c.source.request_type(),
                    channel: c.channel,
                })
                .collect();
            let endpoint = redact_url_password(&cfg.endpoint.endpoint_url);
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: {} request file(s) for {} at {}",
                    clients.len(),
                    cfg.endpoint.qualified_service(),
                    endpoint
                );
                for c in &clients {
                    println!("- {} -> {}", c.request, c.channel);
                }
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: true,
                        service: Some(cfg.endpoint.qualified_service()),
                        endpoint: Some(endpoint),
                        clients,
                        errors: vec![],
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            if output.format == OutputFormat::Text {
                print_error(output.format, output.quiet, &format!("validation failed: {err}"));
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: false,
                        service: None,
                        endpoint: None,
                        clients: vec![],
                        errors: vec![err.to_string()],
                    },
                );
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
