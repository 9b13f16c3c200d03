use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use super::{delegate_to_timer, unix_timestamp};
use crate::error::{panic_message, BoxError, TimerError};
use crate::event::TimerEvent;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::timer::{Timer, TimerSettings};

/// Runs a synchronous producer on every tick
///
/// The loop step does not return until the producer does, so a slow
/// producer delays the next scheduling.
pub struct ProducerTimer<T>
where
    T: Send + 'static,
{
    timer: Timer<(), T>,
}

impl<T> ProducerTimer<T>
where
    T: Send + 'static,
{
    /// Create a producer timer on the current tokio runtime
    pub fn new<F, E>(producer: F, interval: Duration, auto_start: bool) -> Result<Self, TimerError>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let scheduler = Arc::new(TokioScheduler::current()?);
        Ok(Self::with_scheduler(
            producer,
            TimerSettings::new(interval).auto_start(auto_start),
            scheduler,
        ))
    }

    pub fn with_scheduler<F, E>(producer: F, settings: TimerSettings, scheduler: Arc<dyn Scheduler>) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        // listeners must be wired before the first tick can fire
        let timer = Timer::with_scheduler(settings.clone().auto_start(false), Vec::new(), scheduler);

        let inner = Arc::downgrade(&timer.inner);
        let interval = settings.interval;
        timer.on_tick(move |_| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let timestamp = unix_timestamp();
            match panic::catch_unwind(AssertUnwindSafe(|| producer())) {
                Ok(Ok(result)) => inner.emit(TimerEvent::Data {
                    result,
                    timestamp,
                    interval,
                }),
                Ok(Err(source)) => inner.report(TimerError::Producer(source.into())),
                Err(payload) => inner.report(TimerError::ProducerPanicked(panic_message(&*payload))),
            }
        });
        timer.on_error(|_| {});

        if settings.auto_start {
            timer.start();
        }
        Self { timer }
    }
}

delegate_to_timer!(ProducerTimer);
