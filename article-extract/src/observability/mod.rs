//! Observability utilities.

mod attempts;
mod subscriber;

pub use attempts::{
    AttemptEvent, AttemptObserver, CollectingAttemptObserver, LoggingAttemptObserver,
    NoOpAttemptObserver, SpanTimer,
};
pub use subscriber::init_tracing;
