//! Layered configuration loading: defaults, file, environment.

use crate::config::MeshConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "MESH_";

/// Load, override and validate the mesh configuration.
///
/// With no path, built-in defaults are used. `.yaml`/`.yml` and `.toml`
/// files are supported. Environment overrides are read from the process
/// environment.
///
/// # Errors
/// Returns error if the file cannot be read or parsed, an override is
/// malformed, or the result fails validation
pub fn load_config(path: Option<&Path>) -> ConfigResult<MeshConfig> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => {
            debug!("No config file given, using defaults");
            MeshConfig::default()
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;

    info!(
        agents = config.agents.len(),
        llm_routing = config.routing.llm_routing,
        fallback_agent_id = %config.routing.fallback_agent_id,
        "Configuration loaded"
    );

    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<MeshConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        "toml" => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        other => Err(ConfigError::UnsupportedFormat(if other.is_empty() {
            path.display().to_string()
        } else {
            other.to_string()
        })),
    }
}

/// Apply `MESH_*` overrides read through `lookup`.
///
/// `lookup` receives the full variable name and returns its value if set.
///
/// # Errors
/// Returns error if a set variable cannot be parsed
pub fn apply_env_overrides<F>(config: &mut MeshConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        let name = format!("{ENV_PREFIX}{suffix}");
        lookup(&name).map(|value| (name, value))
    };

    if let Some((_, value)) = var("FALLBACK_AGENT_ID") {
        config.routing.fallback_agent_id = value;
    }
    if let Some((name, value)) = var("LLM_ROUTING") {
        config.routing.llm_routing = parse_bool(&name, &value)?;
    }
    if let Some((name, value)) = var("TOP_K") {
        config.directory.top_k = parse_number(&name, &value)?;
    }
    if let Some((name, value)) = var("EMBEDDING_DIMENSION") {
        config.directory.embedding_dimension = parse_number(&name, &value)?;
    }
    if let Some((name, value)) = var("DIRECTORY_TTL") {
        config.directory.ttl = parse_duration(&name, &value)?;
    }
    if let Some((name, value)) = var("MAX_PARALLEL_AGENTS") {
        config.orchestrator.max_parallel_agents = parse_number(&name, &value)?;
    }
    if let Some((name, value)) = var("AGENT_TIMEOUT") {
        config.orchestrator.agent_timeout = parse_duration(&name, &value)?;
    }
    if let Some((name, value)) = var("HEARTBEAT_INTERVAL") {
        config.heartbeat.interval = parse_duration(&name, &value)?;
    }
    if let Some((_, value)) = var("LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Some((name, value)) = var("LOG_FORMAT") {
        config.logging.format = value.parse().map_err(|e: mesh_telemetry::TelemetryError| {
            ConfigError::Env {
                var: name,
                message: e.to_string(),
            }
        })?;
    }

    Ok(())
}

fn parse_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var: var.to_string(),
            message: format!("expected a boolean, got '{value}'"),
        }),
    }
}

fn parse_number<T>(var: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        message: e.to_string(),
    })
}

fn parse_duration(var: &str, value: &str) -> ConfigResult<Duration> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Env {
        var: var.to_string(),
        message: e.to_string(),
    })
}
