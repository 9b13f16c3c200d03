use config::Config;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{parse_interval, resolve_config_value};
use crate::error::TimerError;
use crate::time_unit::TimeUnit;

/// Construction parameters shared by every timer flavour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    /// Delay between automatic ticks
    pub interval: Duration,
    /// Start running as soon as the timer is built
    pub auto_start: bool,
    /// Async producers only: start a new run while the previous one is pending
    pub allow_overlap: bool,
}

/// Raw section as written in a config file; every value may be a placeholder
#[derive(Debug, Deserialize)]
struct TimerSection {
    interval: String,
    time_unit: Option<String>,
    auto_start: Option<String>,
    allow_overlap: Option<String>,
}

impl TimerSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            auto_start: false,
            allow_overlap: true,
        }
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn allow_overlap(mut self, allow_overlap: bool) -> Self {
        self.allow_overlap = allow_overlap;
        self
    }

    /// Read settings from a config section
    ///
    /// ```toml
    /// [poller]
    /// interval = "${app.poll_interval:5s}"
    /// auto_start = true
    /// ```
    ///
    /// A bare numeric `interval` is read in `time_unit` (milliseconds when
    /// absent).
    pub fn from_config(config: &Config, section: &str) -> Result<Self, TimerError> {
        let raw: TimerSection = config.get(section)?;

        let time_unit = match raw.time_unit {
            Some(value) => resolve_config_value(&value, config)?
                .parse::<TimeUnit>()
                .map_err(TimerError::InvalidInterval)?,
            None => TimeUnit::default(),
        };
        let interval = parse_interval(&resolve_config_value(&raw.interval, config)?, time_unit)?;

        Ok(Self {
            interval,
            auto_start: resolve_flag(raw.auto_start, config, false)?,
            allow_overlap: resolve_flag(raw.allow_overlap, config, true)?,
        })
    }
}

fn resolve_flag(value: Option<String>, config: &Config, default: bool) -> Result<bool, TimerError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let resolved = resolve_config_value(&value, config)?;
    resolved.trim().to_lowercase().parse::<bool>().map_err(|_| {
        TimerError::Config(config::ConfigError::Message(format!(
            "expected true or false, got '{}'",
            resolved
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(source: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .expect("valid toml")
    }

    #[test]
    fn reads_shorthand_interval_and_flags() {
        let config = from_toml(
            r#"
            [poller]
            interval = "250ms"
            auto_start = true
            allow_overlap = false
            "#,
        );

        let settings = TimerSettings::from_config(&config, "poller").unwrap();

        assert_eq!(settings.interval, Duration::from_millis(250));
        assert!(settings.auto_start);
        assert!(!settings.allow_overlap);
    }

    #[test]
    fn bare_number_uses_time_unit_and_defaults_apply() {
        let config = from_toml(
            r#"
            [poller]
            interval = 3
            time_unit = "seconds"
            "#,
        );

        let settings = TimerSettings::from_config(&config, "poller").unwrap();

        assert_eq!(settings, TimerSettings::new(Duration::from_secs(3)));
    }

    #[test]
    fn placeholders_resolve_against_other_keys() {
        let config = from_toml(
            r#"
            [app]
            poll = "2s"

            [poller]
            interval = "${app.poll}"
            auto_start = "${app.autostart:true}"
            "#,
        );

        let settings = TimerSettings::from_config(&config, "poller").unwrap();

        assert_eq!(settings.interval, Duration::from_secs(2));
        assert!(settings.auto_start);
    }

    #[test]
    fn rejects_garbage_flags() {
        let config = from_toml(
            r#"
            [poller]
            interval = "1s"
            auto_start = "sometimes"
            "#,
        );

        assert!(matches!(
            TimerSettings::from_config(&config, "poller"),
            Err(TimerError::Config(_))
        ));
    }
}
