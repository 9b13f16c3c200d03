use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use super::{delegate_to_timer, unix_timestamp};
use crate::error::{panic_message, BoxError, TimerError};
use crate::event::TimerEvent;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::timer::{Timer, TimerSettings};

/// Runs an asynchronous producer on every tick
///
/// The tick listener only spawns the producer future, so the loop never
/// waits for it and `data`/`error` may arrive after later ticks. Runs may
/// overlap unless `allow_overlap` is off, in which case ticks that find a run
/// still in flight are skipped. Results arriving after `destroy` are dropped.
pub struct AsyncProducerTimer<T>
where
    T: Send + 'static,
{
    timer: Timer<(), T>,
    in_flight: Arc<AtomicUsize>,
}

impl<T> AsyncProducerTimer<T>
where
    T: Send + 'static,
{
    /// Create an async producer timer on the current tokio runtime
    pub fn new<F, Fut, E>(producer: F, interval: Duration, auto_start: bool) -> Result<Self, TimerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let scheduler = TokioScheduler::from_handle(runtime.clone());
        Ok(Self::with_runtime(
            producer,
            TimerSettings::new(interval).auto_start(auto_start),
            Arc::new(scheduler),
            runtime,
        ))
    }

    /// Drive ticks with `scheduler` and run producer futures on `runtime`
    pub fn with_runtime<F, Fut, E>(
        producer: F,
        settings: TimerSettings,
        scheduler: Arc<dyn Scheduler>,
        runtime: Handle,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let timer = Timer::with_scheduler(settings.clone().auto_start(false), Vec::new(), scheduler);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let inner = Arc::downgrade(&timer.inner);
        let running = Arc::clone(&in_flight);
        let allow_overlap = settings.allow_overlap;
        let interval = settings.interval;
        timer.on_tick(move |_| {
            if allow_overlap {
                running.fetch_add(1, Ordering::SeqCst);
            } else if running
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("producer still in flight, skipping tick");
                return;
            }

            let timestamp = unix_timestamp();
            let future = match panic::catch_unwind(AssertUnwindSafe(|| producer())) {
                Ok(future) => future,
                Err(payload) => {
                    running.fetch_sub(1, Ordering::SeqCst);
                    if let Some(inner) = inner.upgrade() {
                        inner.report(TimerError::ProducerPanicked(panic_message(&*payload)));
                    }
                    return;
                }
            };
            let inner = inner.clone();
            let running = Arc::clone(&running);
            let runtime_for_task = runtime.clone();
            runtime.spawn(async move {
                // a separate task turns a panicking producer into a JoinError
                let outcome = runtime_for_task.spawn(future).await;
                running.fetch_sub(1, Ordering::SeqCst);

                let Some(inner) = inner.upgrade() else {
                    return;
                };
                if inner.is_destroyed() {
                    debug!("timer destroyed while producer was running, dropping result");
                    return;
                }
                match outcome {
                    Ok(Ok(result)) => inner.emit(TimerEvent::Data {
                        result,
                        timestamp,
                        interval,
                    }),
                    Ok(Err(source)) => inner.report(TimerError::Producer(source.into())),
                    Err(join_error) if join_error.is_panic() => {
                        let payload = join_error.into_panic();
                        inner.report(TimerError::ProducerPanicked(panic_message(&*payload)))
                    }
                    Err(join_error) => inner.report(TimerError::Producer(Box::new(join_error))),
                }
            });
        });
        timer.on_error(|_| {});

        if settings.auto_start {
            timer.start();
        }
        Self { timer, in_flight }
    }

    /// Producer runs started but not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

delegate_to_timer!(AsyncProducerTimer);

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const INTERVAL: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn publishes_data_when_the_future_resolves() {
        let timer = AsyncProducerTimer::new(
            || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, BoxError>(42_u32)
            },
            INTERVAL,
            true,
        )
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.on_data(move |result, timestamp, interval| {
            let _ = tx.send((*result, timestamp, interval));
        });

        let (result, timestamp, interval) = rx.recv().await.unwrap();

        assert_eq!(result, 42);
        assert_eq!(interval, INTERVAL);
        assert!((chrono::Utc::now().timestamp() - timestamp).abs() <= 1);
        timer.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_future_emits_error_and_no_data() {
        let timer = AsyncProducerTimer::new(
            || async { Err::<u32, _>("upstream refused") },
            INTERVAL,
            false,
        )
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let data_tx = tx.clone();
        timer.on_data(move |_, _, _| {
            let _ = data_tx.send("data".to_string());
        });
        timer.on_error(move |cause| {
            let _ = tx.send(cause.to_string());
        });

        assert!(timer.tick());

        assert_eq!(rx.recv().await.unwrap(), "producer failed: upstream refused");
        tokio::time::sleep(INTERVAL).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_future_is_reported() {
        let timer = AsyncProducerTimer::new(
            || async {
                if true {
                    panic!("future blew up");
                }
                Ok::<u32, BoxError>(0)
            },
            INTERVAL,
            false,
        )
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.on_error(move |cause| {
            let _ = tx.send(cause.to_string());
        });

        timer.tick();

        assert_eq!(rx.recv().await.unwrap(), "producer panicked: future blew up");
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_runs_are_allowed_by_default() {
        let timer = AsyncProducerTimer::new(
            || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, BoxError>(())
            },
            INTERVAL,
            false,
        )
        .unwrap();

        timer.tick();
        timer.tick();
        timer.tick();
        tokio::task::yield_now().await;

        assert_eq!(timer.in_flight(), 3);
        timer.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn overlap_can_be_disabled() {
        let timer = crate::timer::TimerBuilder::<()>::new()
            .interval(INTERVAL)
            .allow_overlap(false)
            .build_async_producer(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, BoxError>(())
            })
            .unwrap();

        timer.tick();
        timer.tick();

        assert_eq!(timer.in_flight(), 1);
        timer.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn data_reports_the_construction_interval() {
        let timer = AsyncProducerTimer::new(|| async { Ok::<_, BoxError>(()) }, INTERVAL, false).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.on_data(move |_, _, interval| {
            let _ = tx.send(interval);
        });

        timer.set_interval(Duration::from_millis(250));
        timer.tick();

        assert_eq!(rx.recv().await.unwrap(), INTERVAL);
        assert_eq!(timer.interval(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn results_after_stop_are_still_published() {
        let timer = AsyncProducerTimer::new(
            || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<_, BoxError>(7_u8)
            },
            INTERVAL,
            false,
        )
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.on_data(move |result, _, _| {
            let _ = tx.send(*result);
        });

        timer.start();
        timer.tick();
        timer.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(rx.try_recv(), Ok(7));
        assert!(rx.try_recv().is_err());
        assert_eq!(timer.in_flight(), 0);
        timer.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn results_after_destroy_are_dropped() {
        let timer = AsyncProducerTimer::new(
            || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<_, BoxError>(1_u8)
            },
            INTERVAL,
            false,
        )
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        timer.on_data(move |result, _, _| {
            let _ = tx.send(*result);
        });

        timer.tick();
        timer.destroy();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(timer.in_flight(), 0);
    }
}
