use std::path::Path;

use soap_source_core::Settings;

use crate::exit_codes;
use crate::output::print_error;
use crate::{ConfigArgs, OutputArgs};

/// Loads the settings file named by `args` and applies `--set` overrides.
/// On failure the error is printed and the exit code to use is returned.
pub fn load_settings(args: &ConfigArgs, output: &OutputArgs) -> Result<Settings, i32> {
    let content = match std::fs::read_to_string(&args.config) {
        Ok(c) => c,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", args.config.display()),
            );
            return Err(exit_codes::RUNTIME_ERROR);
        }
    };
    let mut settings = match parse_settings(&content, &args.config) {
        Ok(s) => s,
        Err(message) => {
            print_error(output.format, output.quiet, &message);
            return Err(exit_codes::VALIDATION_FAILED);
        }
    };
    if let Err(message) = merge_set(&mut settings, &args.set) {
        print_error(output.format, output.quiet, &message);
        return Err(exit_codes::VALIDATION_FAILED);
    }
    Ok(settings)
}

/// JSON first, then YAML; anything else is read as `key=value` properties.
pub fn parse_settings(content: &str, path: &Path) -> Result<Settings, String> {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(content) {
        return from_value(&v, path);
    }
    if let Ok(v) = serde_yaml::from_str::<serde_json::Value>(content) {
        if v.is_object() {
            return from_value(&v, path);
        }
    }
    parse_properties(content, path)
}

fn from_value(value: &serde_json::Value, path: &Path) -> Result<Settings, String> {
    let map = value
        .as_object()
        .ok_or_else(|| format!("{}: settings must be a mapping of keys to values", path.display()))?;
    let mut settings = Settings::new();
    for (key, v) in map {
        let text = match v {
            serde_json::Value::Null => continue,
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| scalar(item).ok_or_else(|| unsupported(path, key)))
                .collect::<Result<Vec<_>, _>>()?
                .join(","),
            other => scalar(other).ok_or_else(|| unsupported(path, key))?,
        };
        settings.insert(key.clone(), text);
    }
    Ok(settings)
}

fn scalar(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unsupported(path: &Path, key: &str) -> String {
    format!("{}: unsupported value for `{key}`", path.display())
}

fn parse_properties(content: &str, path: &Path) -> Result<Settings, String> {
    let mut settings = Settings::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .or_else(|| line.split_once(':'))
            .ok_or_else(|| {
                format!(
                    "{}:{}: expected KEY=VALUE, settings file is neither JSON, YAML nor properties",
                    path.display(),
                    i + 1
                )
            })?;
        settings.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(settings)
}

pub fn merge_set(settings: &mut Settings, set: &[String]) -> Result<(), String> {
    for s in set {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid --set {s:?}, expected KEY=VALUE"))?;
        settings.insert(k.trim().to_string(), v.to_string());
    }
    Ok(())
}
