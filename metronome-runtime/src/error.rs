use std::any::Any;

/// Boxed error returned by fallible listeners and producers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure a timer can report
///
/// Failures raised while the timer is running never propagate to the caller
/// of the scheduling loop; they are delivered as `error` events instead.
/// Only construction and configuration return these directly.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// A listener returned an error
    #[error("listener failed: {0}")]
    Listener(#[source] BoxError),

    /// A listener panicked
    #[error("listener panicked: {0}")]
    ListenerPanicked(String),

    /// The producer function returned an error
    #[error("producer failed: {0}")]
    Producer(#[source] BoxError),

    /// The producer function failed without an error value (a panic)
    #[error("producer panicked: {0}")]
    ProducerPanicked(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("no tokio runtime available, pass an explicit scheduler")]
    NoRuntime,
}

/// Turn a panic payload into something printable
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
