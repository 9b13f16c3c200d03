//! # Metronome - recurring interval timers for Rust
//!
//! A [`Timer`] fires a `tick` event every interval until it is stopped or
//! destroyed. [`ProducerTimer`] and [`AsyncProducerTimer`] run a function on
//! every tick and publish its result as a `data` event.
//!
//! ## Features
//!
//! - **Start / stop / toggle / destroy**: a small, forgiving state machine;
//!   calls after `destroy` are silent no-ops
//! - **Fixed arguments**: values delivered with every automatic tick
//! - **Manual ticks**: force a firing with your own arguments at any time
//! - **Producers**: sync or async functions whose results become `data`
//!   events with a timestamp and the interval
//! - **Failure isolation**: failing listeners and producers become `error`
//!   events instead of breaking the loop
//! - **Config support**: read intervals from TOML/YAML with `${key:default}`
//!   placeholders and `APP_` environment overrides
//! - **Deterministic tests**: swap the tokio scheduler for [`ManualScheduler`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metronome::{Timer, TimerError};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), TimerError> {
//!     let timer: Timer<&str> = Timer::new(Duration::from_millis(500), true, vec!["heartbeat"])?;
//!     timer.on_tick(|args| println!("tick: {:?}", args));
//!
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     timer.destroy();
//!     Ok(())
//! }
//! ```
//!
//! ## Producers
//!
//! ```rust,no_run
//! use metronome::{AsyncProducerTimer, BoxError};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), metronome::TimerError> {
//! let poller = AsyncProducerTimer::new(
//!     || async { Ok::<_, BoxError>(fetch_price().await) },
//!     Duration::from_secs(5),
//!     true,
//! )?;
//! poller.on_data(|price, timestamp, _| println!("[{timestamp}] price = {price}"));
//! poller.on_error(|error| eprintln!("poll failed: {error}"));
//! # Ok(())
//! # }
//! # async fn fetch_price() -> f64 { 1.0 }
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [app]
//! poll = "2s"
//!
//! [poller]
//! interval = "${app.poll:5s}"
//! auto_start = true
//! allow_overlap = false
//! ```
//!
//! and build from it:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), metronome::TimerError> {
//! let timer = metronome::TimerBuilder::<()>::with_toml("config/application.toml")?
//!     .settings_from("poller")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use metronome_runtime::{
    load_toml_config, load_yaml_config, resolve_config_value, AsyncProducerTimer, BoxError,
    EventKind, ListenerId, ManualScheduler, ProducerTimer, ScheduleHandle, Scheduler, TimeUnit,
    Timer, TimerBuilder, TimerError, TimerEvent, TimerPhase, TimerSettings, TokioScheduler,
};

// Full runtime API for anything not re-exported above
pub use metronome_runtime;
