use config::Config;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

use super::{Timer, TimerSettings};
use crate::config::{load_toml_config, load_yaml_config, parse_interval, resolve_config_value};
use crate::error::{BoxError, TimerError};
use crate::producer::{AsyncProducerTimer, ProducerTimer};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::time_unit::TimeUnit;

enum IntervalSource {
    Fixed(Duration),
    /// Duration string or `${key:default}` placeholder, resolved at build time
    Expr(String),
}

/// Builder for timers and producer timers
///
/// Explicit values win over values read from a config section.
pub struct TimerBuilder<A = ()> {
    config: Arc<Config>,
    section: Option<String>,
    interval: Option<IntervalSource>,
    auto_start: Option<bool>,
    allow_overlap: Option<bool>,
    fixed_args: Vec<A>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl<A> Default for TimerBuilder<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TimerBuilder<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Create a new timer builder with default config (empty)
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with custom config
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            section: None,
            interval: None,
            auto_start: None,
            allow_overlap: None,
            fixed_args: Vec::new(),
            scheduler: None,
        }
    }

    /// Create with TOML config file
    pub fn with_toml<P: AsRef<Path>>(path: P) -> Result<Self, TimerError> {
        Ok(Self::with_config(load_toml_config(path)?))
    }

    /// Create with YAML config file
    pub fn with_yaml<P: AsRef<Path>>(path: P) -> Result<Self, TimerError> {
        Ok(Self::with_config(load_yaml_config(path)?))
    }

    /// Read interval and flags from `section` of the config
    pub fn settings_from(mut self, section: &str) -> Self {
        self.section = Some(section.to_string());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(IntervalSource::Fixed(interval));
        self
    }

    /// Interval as text: "500ms", "5s", a bare millisecond count, or a
    /// placeholder such as `${app.interval:5s}`
    pub fn interval_expr(mut self, expr: &str) -> Self {
        self.interval = Some(IntervalSource::Expr(expr.to_string()));
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = Some(auto_start);
        self
    }

    pub fn allow_overlap(mut self, allow_overlap: bool) -> Self {
        self.allow_overlap = Some(allow_overlap);
        self
    }

    /// Arguments delivered with every automatic tick
    pub fn fixed_args(mut self, fixed_args: Vec<A>) -> Self {
        self.fixed_args = fixed_args;
        self
    }

    /// Drive the timer with `scheduler` instead of the current tokio runtime
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Resolve the final settings without building anything
    pub fn settings(&self) -> Result<TimerSettings, TimerError> {
        let configured = match &self.section {
            Some(section) => Some(TimerSettings::from_config(&self.config, section)?),
            None => None,
        };

        let interval = match &self.interval {
            Some(IntervalSource::Fixed(interval)) => *interval,
            Some(IntervalSource::Expr(expr)) => {
                let resolved = resolve_config_value(expr, &self.config)?;
                parse_interval(&resolved, TimeUnit::Milliseconds)?
            }
            None => configured
                .as_ref()
                .map(|settings| settings.interval)
                .ok_or_else(|| TimerError::InvalidInterval("no interval configured".to_string()))?,
        };

        let mut settings = configured.unwrap_or_else(|| TimerSettings::new(interval));
        settings.interval = interval;
        if let Some(auto_start) = self.auto_start {
            settings.auto_start = auto_start;
        }
        if let Some(allow_overlap) = self.allow_overlap {
            settings.allow_overlap = allow_overlap;
        }

        debug!(
            interval_ms = settings.interval.as_millis() as u64,
            auto_start = settings.auto_start,
            allow_overlap = settings.allow_overlap,
            "resolved timer settings"
        );
        Ok(settings)
    }

    fn resolve_scheduler(&mut self) -> Result<Arc<dyn Scheduler>, TimerError> {
        match self.scheduler.take() {
            Some(scheduler) => Ok(scheduler),
            None => Ok(Arc::new(TokioScheduler::current()?)),
        }
    }

    pub fn build(mut self) -> Result<Timer<A>, TimerError> {
        let settings = self.settings()?;
        let scheduler = self.resolve_scheduler()?;
        Ok(Timer::with_scheduler(settings, self.fixed_args, scheduler))
    }
}

impl TimerBuilder<()> {
    /// Build a timer publishing the result of a synchronous producer
    pub fn build_producer<T, F, E>(mut self, producer: F) -> Result<ProducerTimer<T>, TimerError>
    where
        T: Send + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let settings = self.settings()?;
        let scheduler = self.resolve_scheduler()?;
        Ok(ProducerTimer::with_scheduler(producer, settings, scheduler))
    }

    /// Build a timer publishing the result of an asynchronous producer
    ///
    /// Producer futures run on the current tokio runtime.
    pub fn build_async_producer<T, F, Fut, E>(
        mut self,
        producer: F,
    ) -> Result<AsyncProducerTimer<T>, TimerError>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let settings = self.settings()?;
        let scheduler = self.resolve_scheduler()?;
        Ok(AsyncProducerTimer::with_runtime(producer, settings, scheduler, runtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use config::{File, FileFormat};
    use std::sync::Mutex;

    fn config() -> Config {
        Config::builder()
            .add_source(File::from_str(
                r#"
                [app]
                poll = "2s"

                [poller]
                interval = "500ms"
                auto_start = true
                "#,
                FileFormat::Toml,
            ))
            .build()
            .expect("valid toml")
    }

    #[test]
    fn explicit_values_override_the_config_section() {
        let settings = TimerBuilder::<()>::with_config(config())
            .settings_from("poller")
            .interval_expr("${app.poll}")
            .auto_start(false)
            .settings()
            .unwrap();

        assert_eq!(settings.interval, Duration::from_secs(2));
        assert!(!settings.auto_start);
        assert!(settings.allow_overlap);
    }

    #[test]
    fn section_alone_is_enough() {
        let settings = TimerBuilder::<()>::with_config(config())
            .settings_from("poller")
            .settings()
            .unwrap();

        assert_eq!(settings, TimerSettings::new(Duration::from_millis(500)).auto_start(true));
    }

    #[test]
    fn missing_interval_is_rejected() {
        assert!(matches!(
            TimerBuilder::<()>::new().settings(),
            Err(TimerError::InvalidInterval(_))
        ));
    }

    #[test]
    fn building_outside_a_runtime_needs_a_scheduler() {
        let result = TimerBuilder::<u8>::new().interval(Duration::from_secs(1)).build();
        assert!(matches!(result, Err(TimerError::NoRuntime)));
    }

    #[test]
    fn builds_a_running_timer_with_fixed_args() {
        let scheduler = ManualScheduler::new();
        let timer = Timer::builder()
            .interval_expr("1s")
            .auto_start(true)
            .fixed_args(vec!["heartbeat"])
            .scheduler(Arc::new(scheduler.clone()))
            .build()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        timer.on_tick(move |args| sink.lock().unwrap().extend_from_slice(args));

        scheduler.advance(Duration::from_secs(2));

        assert_eq!(*seen.lock().unwrap(), vec!["heartbeat", "heartbeat"]);
    }
}
