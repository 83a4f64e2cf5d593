//! `GENFLOW_*` environment variable overrides.

use std::str::FromStr;

use super::EngineConfig;
use crate::errors::GenflowError;

pub(super) fn apply<F>(config: &mut EngineConfig, lookup: F) -> Result<(), GenflowError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("GENFLOW_SECRET_ENABLED") {
        config.auth.secret_enabled = parse_bool("GENFLOW_SECRET_ENABLED", &v)?;
    }
    if let Some(v) = lookup("GENFLOW_SECRET_KEY") {
        config.auth.secret_key = Some(v);
    }
    if let Some(v) = lookup("GENFLOW_PRIMARY_MODEL") {
        config.completion.primary_model = v;
    }
    if let Some(v) = lookup("GENFLOW_FALLBACK_MODEL") {
        config.completion.fallback_model = if v.is_empty() { None } else { Some(v) };
    }
    if let Some(v) = lookup("GENFLOW_FALLBACK_ENABLED") {
        config.completion.fallback_enabled = parse_bool("GENFLOW_FALLBACK_ENABLED", &v)?;
    }
    if let Some(v) = lookup("GENFLOW_MAX_RETRIES") {
        config.completion.max_retries = parse_number("GENFLOW_MAX_RETRIES", &v)?;
    }
    if let Some(v) = lookup("GENFLOW_COMPLETION_TIMEOUT_SECS") {
        config.completion.timeout_seconds = parse_number("GENFLOW_COMPLETION_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = lookup("GENFLOW_LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = lookup("GENFLOW_LOG_JSON") {
        config.logging.json = parse_bool("GENFLOW_LOG_JSON", &v)?;
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, GenflowError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GenflowError::config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, GenflowError> {
    value
        .trim()
        .parse()
        .map_err(|_| GenflowError::config(format!("{key}: expected a number, got '{value}'")))
}
