//! Metronome Runtime - recurring interval timers and producer timers
//!
//! This crate provides the timer state machine, the listener registry and
//! the schedulers that drive the timer loop.

mod config;
mod emitter;
mod error;
mod event;
mod time_unit;
pub mod producer;
pub mod scheduler;
pub mod timer;

// Re-export public API
pub use crate::config::{load_toml_config, load_yaml_config, parse_interval, resolve_config_value};
pub use emitter::{Listener, ListenerId};
pub use error::{BoxError, TimerError};
pub use event::{EventKind, TimerEvent};
pub use producer::{AsyncProducerTimer, ProducerTimer};
pub use scheduler::{ManualScheduler, ScheduleHandle, ScheduledTask, Scheduler, TokioScheduler};
pub use time_unit::TimeUnit;
pub use timer::{Timer, TimerBuilder, TimerPhase, TimerSettings, MIN_DELAY};
