use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{panic_message, BoxError, TimerError};
use crate::event::{EventKind, TimerEvent};

/// Callback registered for one event kind
pub type Listener<A, T> = Arc<dyn Fn(&TimerEvent<A, T>) -> Result<(), BoxError> + Send + Sync>;

/// Identifies a registration so it can be removed with `off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration<A, T> {
    id: ListenerId,
    once: bool,
    listener: Listener<A, T>,
}

/// Ordered listener registry keyed by event kind
pub(crate) struct EventEmitter<A, T> {
    next_id: AtomicU64,
    registry: Mutex<HashMap<EventKind, Vec<Registration<A, T>>>>,
}

impl<A, T> EventEmitter<A, T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            registry: Mutex::new(HashMap::new()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Registration<A, T>>>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add(&self, kind: EventKind, once: bool, listener: Listener<A, T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry()
            .entry(kind)
            .or_default()
            .push(Registration { id, once, listener });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.registry();
        for entries in registry.values_mut() {
            if let Some(pos) = entries.iter().position(|entry| entry.id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.registry().get(&kind).map_or(0, Vec::len)
    }

    /// Invoke every listener for the event's kind in registration order
    ///
    /// The registry lock is released before any listener runs, so listeners
    /// may register, remove or emit. A failing listener does not stop the
    /// remaining ones; all failures are returned.
    pub(crate) fn emit(&self, event: &TimerEvent<A, T>) -> Vec<TimerError> {
        let snapshot: Vec<Listener<A, T>> = {
            let mut registry = self.registry();
            let Some(entries) = registry.get_mut(&event.kind()) else {
                return Vec::new();
            };
            let snapshot = entries.iter().map(|entry| Arc::clone(&entry.listener)).collect();
            entries.retain(|entry| !entry.once);
            snapshot
        };

        let mut failures = Vec::new();
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(source)) => failures.push(TimerError::Listener(source)),
                Err(payload) => failures.push(TimerError::ListenerPanicked(panic_message(&*payload))),
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Emitter = EventEmitter<u32, ()>;

    fn listener(
        f: impl Fn(&TimerEvent<u32>) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Listener<u32, ()> {
        Arc::new(f)
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Listener<u32, ()> {
        let log = Arc::clone(log);
        listener(move |event| {
            log.lock().unwrap().push(format!("{name}:{:?}", event.kind()));
            Ok(())
        })
    }

    #[test]
    fn dispatches_in_registration_order() {
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        emitter.add(EventKind::Tick, false, recorder(&log, "first"));
        emitter.add(EventKind::Tick, false, recorder(&log, "second"));
        emitter.add(EventKind::Start, false, recorder(&log, "other"));

        let failures = emitter.emit(&TimerEvent::Ticked { args: vec![1] });

        assert!(failures.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["first:Tick", "second:Tick"]);
    }

    #[test]
    fn failing_listener_does_not_block_the_rest() {
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        emitter.add(EventKind::Tick, false, listener(|_| Err("nope".into())));
        emitter.add(EventKind::Tick, false, listener(|_| panic!("listener exploded")));
        emitter.add(EventKind::Tick, false, recorder(&log, "survivor"));

        let failures = emitter.emit(&TimerEvent::Ticked { args: vec![] });

        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0], TimerError::Listener(_)));
        assert!(
            matches!(&failures[1], TimerError::ListenerPanicked(message) if message == "listener exploded")
        );
        assert_eq!(*log.lock().unwrap(), vec!["survivor:Tick"]);
    }

    #[test]
    fn once_listeners_fire_a_single_time() {
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        emitter.add(EventKind::Tick, true, recorder(&log, "once"));

        emitter.emit(&TimerEvent::Ticked { args: vec![] });
        emitter.emit(&TimerEvent::Ticked { args: vec![] });

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(emitter.count(EventKind::Tick), 0);
    }

    #[test]
    fn removed_listeners_are_not_called() {
        let emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = emitter.add(EventKind::Stop, false, recorder(&log, "gone"));

        assert!(emitter.remove(id));
        assert!(!emitter.remove(id));
        emitter.emit(&TimerEvent::Stopped);

        assert!(log.lock().unwrap().is_empty());
    }
}
