use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ScheduleHandle, ScheduledTask, Scheduler};

type TaskKey = (Duration, u64);

#[derive(Default)]
struct Clock {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<TaskKey, ScheduledTask>,
}

/// Deterministic scheduler driven by a virtual clock
///
/// Nothing runs until `advance` moves the clock. Tasks due at the same
/// instant run in the order they were scheduled.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<Clock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.clock().now
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.clock().pending.len()
    }

    /// Move the clock forward, running every task that falls due on the way
    ///
    /// Tasks scheduled by running tasks are picked up in the same call when
    /// their deadline is within the window.
    pub fn advance(&self, by: Duration) {
        let target = self.now().saturating_add(by);
        loop {
            let task = {
                let mut clock = self.clock();
                let due = match clock.pending.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= target => deadline,
                    _ => break,
                };
                clock.now = due;
                clock.pending.pop_first().map(|(_, task)| task)
            };
            if let Some(task) = task {
                task();
            }
        }
        self.clock().now = target;
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> ScheduleHandle {
        let key = {
            let mut clock = self.clock();
            let key = (clock.now.saturating_add(delay), clock.next_seq);
            clock.next_seq += 1;
            clock.pending.insert(key, task);
            key
        };
        let clock = Arc::downgrade(&self.clock);
        ScheduleHandle::new(move || {
            if let Some(clock) = clock.upgrade() {
                clock
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pending
                    .remove(&key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(log: &Arc<Mutex<Vec<u64>>>, value: u64) -> ScheduledTask {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(value))
    }

    #[test]
    fn runs_tasks_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        scheduler.schedule(Duration::from_millis(30), push(&log, 30));
        scheduler.schedule(Duration::from_millis(10), push(&log, 10));
        scheduler.schedule(Duration::from_millis(20), push(&log, 20));

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(*log.lock().unwrap(), vec![10, 20]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(25));

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(*log.lock().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn cancelled_tasks_never_run() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = scheduler.schedule(Duration::from_millis(10), push(&log, 1));

        handle.cancel();
        scheduler.advance(Duration::from_secs(1));

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn far_deadlines_saturate_instead_of_overflowing() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        scheduler.advance(Duration::from_secs(1));
        scheduler.schedule(Duration::MAX, push(&log, 1));

        assert_eq!(scheduler.pending(), 1);
        scheduler.advance(Duration::MAX);

        assert_eq!(*log.lock().unwrap(), vec![1]);
        assert_eq!(scheduler.now(), Duration::MAX);
    }

    #[test]
    fn tasks_scheduled_while_advancing_run_within_the_window() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = scheduler.clone();
        let inner_log = Arc::clone(&log);
        scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                inner_log.lock().unwrap().push(inner.now().as_millis() as u64);
                inner.schedule(Duration::from_millis(10), push(&inner_log, 99));
            }),
        );

        scheduler.advance(Duration::from_millis(20));

        assert_eq!(*log.lock().unwrap(), vec![10, 99]);
    }
}
