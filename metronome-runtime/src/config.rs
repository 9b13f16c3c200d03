use config::{Config, File, FileFormat};
use std::path::Path;
use std::time::Duration;

use crate::error::TimerError;
use crate::time_unit::TimeUnit;

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config, TimerError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .add_source(config::Environment::with_prefix("APP").separator("_"))
        .build()?;
    Ok(config)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config, TimerError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Yaml))
        .add_source(config::Environment::with_prefix("APP").separator("_"))
        .build()?;
    Ok(config)
}

/// Resolve config placeholder like ${app.interval} or ${app.interval:default}
pub fn resolve_config_value(value: &str, config: &Config) -> Result<String, TimerError> {
    let Some(inner) = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Ok(value.to_string());
    };

    match inner.split_once(':') {
        Some((key, default_value)) => match config.get_string(key) {
            Ok(resolved) => Ok(resolved),
            Err(_) => Ok(default_value.to_string()),
        },
        None => Ok(config.get_string(inner)?),
    }
}

/// Parse an interval expression into a `Duration`
///
/// Accepts shorthand like "250ms" or "5s"; a bare number is read in
/// `default_unit`.
pub fn parse_interval(expr: &str, default_unit: TimeUnit) -> Result<Duration, TimerError> {
    if let Some((value, unit)) = TimeUnit::parse_duration(expr) {
        return Ok(unit.to_duration(value));
    }

    let value = expr
        .trim()
        .parse::<u64>()
        .map_err(|_| TimerError::InvalidInterval(expr.to_string()))?;
    Ok(default_unit.to_duration(value))
}
