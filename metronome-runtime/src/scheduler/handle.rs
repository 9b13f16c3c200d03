use std::fmt;

/// Handle for one pending scheduled task
/// Dropping the handle leaves the task scheduled; call `cancel` to revoke it
pub struct ScheduleHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl ScheduleHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Revoke the task if it has not run yet
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}
