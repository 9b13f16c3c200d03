use std::time::Duration;

use tokio::runtime::Handle;

use super::{ScheduleHandle, ScheduledTask, Scheduler};
use crate::error::TimerError;

/// Scheduler backed by the tokio timer
///
/// Each outstanding step is a spawned task sleeping for the delay; cancelling
/// aborts it.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Use the runtime the caller is running on
    pub fn current() -> Result<Self, TimerError> {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        Ok(Self { runtime })
    }

    pub fn from_handle(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> ScheduleHandle {
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        ScheduleHandle::new(move || handle.abort())
    }
}
