use std::time::Duration;

use crate::error::TimerError;

/// Key used to register listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Stop,
    Tick,
    Data,
    Error,
}

/// Events emitted by a timer
///
/// `A` is the tick argument type and `T` the result type of a producer.
/// Plain timers never emit `Data`.
#[derive(Debug)]
pub enum TimerEvent<A, T = ()> {
    /// The timer transitioned to running
    Started,
    /// The timer transitioned to paused
    Stopped,
    /// One firing, manual or automatic
    Ticked { args: Vec<A> },
    /// A producer completed successfully
    Data {
        result: T,
        /// Whole seconds since the Unix epoch, captured before the producer ran
        timestamp: i64,
        interval: Duration,
    },
    Errored { cause: TimerError },
}

impl<A, T> TimerEvent<A, T> {
    pub fn kind(&self) -> EventKind {
        match self {
            TimerEvent::Started => EventKind::Start,
            TimerEvent::Stopped => EventKind::Stop,
            TimerEvent::Ticked { .. } => EventKind::Tick,
            TimerEvent::Data { .. } => EventKind::Data,
            TimerEvent::Errored { .. } => EventKind::Error,
        }
    }
}
