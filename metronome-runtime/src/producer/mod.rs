//! Timers that run a producer on every tick and publish its result as `data`
//!
//! Both flavours install a no-op `error` listener so failing producers stay
//! quiet unless the caller registers its own listener.

mod future;
mod sync;

pub use future::AsyncProducerTimer;
pub use sync::ProducerTimer;

/// Whole seconds since the Unix epoch, truncated
pub(crate) fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Lifecycle and registration methods shared with the wrapped timer
macro_rules! delegate_to_timer {
    ($wrapper:ident) => {
        impl<T> $wrapper<T>
        where
            T: Send + 'static,
        {
            /// The underlying timer, for anything not forwarded here
            pub fn timer(&self) -> &$crate::timer::Timer<(), T> {
                &self.timer
            }

            pub fn start(&self) -> bool {
                self.timer.start()
            }

            pub fn stop(&self) -> bool {
                self.timer.stop()
            }

            pub fn toggle(&self) -> bool {
                self.timer.toggle()
            }

            /// Destroy the underlying timer
            pub fn destroy(&self) {
                self.timer.destroy()
            }

            /// Run the producer now, outside the automatic schedule
            pub fn tick(&self) -> bool {
                self.timer.tick(Vec::new())
            }

            pub fn is_running(&self) -> bool {
                self.timer.is_running()
            }

            pub fn is_destroyed(&self) -> bool {
                self.timer.is_destroyed()
            }

            pub fn interval(&self) -> std::time::Duration {
                self.timer.interval()
            }

            pub fn set_interval(&self, interval: std::time::Duration) {
                self.timer.set_interval(interval)
            }

            pub fn on<F>(&self, kind: $crate::event::EventKind, listener: F) -> $crate::emitter::ListenerId
            where
                F: Fn(&$crate::event::TimerEvent<(), T>) -> Result<(), $crate::error::BoxError>
                    + Send
                    + Sync
                    + 'static,
            {
                self.timer.on(kind, listener)
            }

            pub fn on_data<F>(&self, listener: F) -> $crate::emitter::ListenerId
            where
                F: Fn(&T, i64, std::time::Duration) + Send + Sync + 'static,
            {
                self.timer.on_data(listener)
            }

            pub fn on_error<F>(&self, listener: F) -> $crate::emitter::ListenerId
            where
                F: Fn(&$crate::error::TimerError) + Send + Sync + 'static,
            {
                self.timer.on_error(listener)
            }

            pub fn off(&self, id: $crate::emitter::ListenerId) -> bool {
                self.timer.off(id)
            }
        }
    };
}

pub(crate) use delegate_to_timer;
