use std::path::Path;

use soap_source_core::response_to_value;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::OutputArgs;

pub async fn map_cmd(path: &Path, output: OutputArgs) -> i32 {
    let raw = match std::fs::read(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    match response_to_value(&raw) {
        Ok(value) => {
            print_result(output.format, output.quiet, &value);
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::VALIDATION_FAILED
        }
    }
}
