mod builder;
mod settings;

pub use builder::TimerBuilder;
pub use settings::TimerSettings;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::emitter::{EventEmitter, ListenerId};
use crate::error::{BoxError, TimerError};
use crate::event::{EventKind, TimerEvent};
use crate::scheduler::{ScheduleHandle, Scheduler, TokioScheduler};

/// Shortest delay between two loop steps; a zero interval is clamped to it
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Observable lifecycle phase of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// Paused and never started
    Created,
    Running,
    Stopped,
    Destroyed,
}

struct TimerState {
    interval: Duration,
    paused: bool,
    destroyed: bool,
    started: bool,
    /// Bumped whenever the loop is re-primed; steps from older generations exit
    generation: u64,
    pending: Option<ScheduleHandle>,
}

pub(crate) struct TimerInner<A, T> {
    state: Mutex<TimerState>,
    emitter: EventEmitter<A, T>,
    fixed_args: Vec<A>,
    scheduler: Arc<dyn Scheduler>,
}

/// Recurring interval timer
///
/// Automatic ticks carry the fixed arguments captured at construction;
/// manual ticks carry whatever the caller passes to [`Timer::tick`].
/// Dropping a timer destroys it.
pub struct Timer<A = (), T = ()>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    pub(crate) inner: Arc<TimerInner<A, T>>,
}

impl<A, T> TimerInner<A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn interval(&self) -> Duration {
        self.state().interval
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    /// Deliver an event, turning listener failures into `error` events
    pub(crate) fn emit(&self, event: TimerEvent<A, T>) {
        if let TimerEvent::Errored { cause } = event {
            self.report(cause);
            return;
        }

        let kind = event.kind();
        for cause in self.emitter.emit(&event) {
            warn!(?kind, error = %cause, "timer listener failed");
            self.report(cause);
        }
    }

    /// Emit an `error` event; failures of error listeners are only logged
    pub(crate) fn report(&self, cause: TimerError) {
        if self.emitter.count(EventKind::Error) == 0 {
            error!(error = %cause, "unhandled timer error");
            return;
        }
        for failure in self.emitter.emit(&TimerEvent::Errored { cause }) {
            warn!(error = %failure, "error listener failed");
        }
    }

    /// Cancel whatever is outstanding and schedule a fresh step one interval out
    fn prime(self: &Arc<Self>, state: &mut TimerState) {
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        let generation = state.generation;
        self.schedule_step(state, generation);
    }

    fn schedule_step(self: &Arc<Self>, state: &mut TimerState, generation: u64) {
        let delay = state.interval.max(MIN_DELAY);
        let timer = Arc::downgrade(self);
        state.pending = Some(self.scheduler.schedule(
            delay,
            Box::new(move || Self::step(timer, generation)),
        ));
    }

    fn step(timer: Weak<Self>, generation: u64) {
        let Some(inner) = timer.upgrade() else {
            return;
        };

        let fire = {
            let state = inner.state();
            if state.destroyed || state.generation != generation {
                return;
            }
            !state.paused
        };

        if fire {
            trace!("automatic tick");
            inner.emit(TimerEvent::Ticked {
                args: inner.fixed_args.clone(),
            });
        }

        let mut state = inner.state();
        if state.destroyed || state.generation != generation {
            return;
        }
        inner.schedule_step(&mut state, generation);
    }
}

impl<A, T> Timer<A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Create a timer on the current tokio runtime
    pub fn new(interval: Duration, auto_start: bool, fixed_args: Vec<A>) -> Result<Self, TimerError> {
        let scheduler = Arc::new(TokioScheduler::current()?);
        Ok(Self::with_scheduler(
            TimerSettings::new(interval).auto_start(auto_start),
            fixed_args,
            scheduler,
        ))
    }

    /// Create a timer driven by an explicit scheduler
    pub fn with_scheduler(settings: TimerSettings, fixed_args: Vec<A>, scheduler: Arc<dyn Scheduler>) -> Self {
        let timer = Self {
            inner: Arc::new(TimerInner {
                state: Mutex::new(TimerState {
                    interval: settings.interval,
                    paused: true,
                    destroyed: false,
                    started: false,
                    generation: 0,
                    pending: None,
                }),
                emitter: EventEmitter::new(),
                fixed_args,
                scheduler,
            }),
        };
        if settings.auto_start {
            timer.start();
        }
        timer
    }

    /// Start automatic ticking
    ///
    /// The first automatic tick fires one interval after this call. Returns
    /// `false` without emitting when already running or destroyed.
    pub fn start(&self) -> bool {
        {
            let mut state = self.inner.state();
            if state.destroyed || !state.paused {
                return false;
            }
            state.paused = false;
            state.started = true;
            self.inner.prime(&mut state);
        }
        debug!(interval_ms = self.interval().as_millis() as u64, "timer started");
        self.inner.emit(TimerEvent::Started);
        true
    }

    /// Pause automatic ticking
    ///
    /// The pending step is left in place; when it fires it skips the tick and
    /// reschedules. An automatic tick whose dispatch has already begun is
    /// still delivered to every listener, including when `stop` is called
    /// from one of them or from another thread while it runs.
    pub fn stop(&self) -> bool {
        {
            let mut state = self.inner.state();
            if state.destroyed || state.paused {
                return false;
            }
            state.paused = true;
        }
        debug!("timer stopped");
        self.inner.emit(TimerEvent::Stopped);
        true
    }

    /// Stop the timer for good and cancel the pending step
    ///
    /// As with [`Timer::stop`], a tick already being dispatched runs to
    /// completion; no automatic tick starts afterwards.
    pub fn destroy(&self) {
        self.stop();
        let pending = {
            let mut state = self.inner.state();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.pending.take()
        };
        if let Some(pending) = pending {
            pending.cancel();
        }
        debug!("timer destroyed");
    }

    /// Emit a manual tick with `args`, whether or not the timer is running
    ///
    /// Returns `false` without emitting once destroyed.
    pub fn tick(&self, args: Vec<A>) -> bool {
        if self.inner.is_destroyed() {
            return false;
        }
        trace!(args = args.len(), "manual tick");
        self.inner.emit(TimerEvent::Ticked { args });
        true
    }

    /// Flip between running and paused and return the new running state
    pub fn toggle(&self) -> bool {
        if self.inner.is_destroyed() {
            return false;
        }
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        let state = self.inner.state();
        !state.paused && !state.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    pub fn phase(&self) -> TimerPhase {
        let state = self.inner.state();
        match (state.destroyed, state.paused, state.started) {
            (true, _, _) => TimerPhase::Destroyed,
            (false, false, _) => TimerPhase::Running,
            (false, true, true) => TimerPhase::Stopped,
            (false, true, false) => TimerPhase::Created,
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval()
    }

    /// Change the interval; the step already scheduled keeps its old delay
    pub fn set_interval(&self, interval: Duration) {
        self.inner.state().interval = interval;
    }

    pub fn fixed_args(&self) -> &[A] {
        &self.inner.fixed_args
    }

    /// Register a fallible listener for every event of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TimerEvent<A, T>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.emitter.add(kind, false, Arc::new(listener))
    }

    /// Register a listener removed after its first call
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TimerEvent<A, T>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.emitter.add(kind, true, Arc::new(listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.emitter.remove(id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.emitter.count(kind)
    }

    pub fn on_start<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(EventKind::Start, move |_| {
            listener();
            Ok(())
        })
    }

    pub fn on_stop<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(EventKind::Stop, move |_| {
            listener();
            Ok(())
        })
    }

    pub fn on_tick<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[A]) + Send + Sync + 'static,
    {
        self.on(EventKind::Tick, move |event| {
            if let TimerEvent::Ticked { args } = event {
                listener(args);
            }
            Ok(())
        })
    }

    /// `data` listener receiving `(result, timestamp_seconds, interval)`
    pub fn on_data<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T, i64, Duration) + Send + Sync + 'static,
    {
        self.on(EventKind::Data, move |event| {
            if let TimerEvent::Data {
                result,
                timestamp,
                interval,
            } = event
            {
                listener(result, *timestamp, *interval);
            }
            Ok(())
        })
    }

    pub fn on_error<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TimerError) + Send + Sync + 'static,
    {
        self.on(EventKind::Error, move |event| {
            if let TimerEvent::Errored { cause } = event {
                listener(cause);
            }
            Ok(())
        })
    }
}

impl<A> Timer<A>
where
    A: Clone + Send + Sync + 'static,
{
    pub fn builder() -> TimerBuilder<A> {
        TimerBuilder::new()
    }
}

impl<A, T> Drop for Timer<A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn drop(&mut self) {
        self.destroy();
    }
}
