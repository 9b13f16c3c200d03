mod handle;
mod manual;
mod runtime;

pub use handle::ScheduleHandle;
pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

use std::time::Duration;

/// One-shot task handed to a scheduler
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run a task once after a delay
///
/// Timers never sleep themselves; every loop step goes through this trait so
/// production code can use the tokio timer and tests a virtual clock.
pub trait Scheduler: Send + Sync + 'static {
    /// Run `task` once, no earlier than `delay` from now
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> ScheduleHandle;
}
