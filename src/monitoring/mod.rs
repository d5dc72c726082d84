//! Observability sink
//!
//! The engine never logs through the process-global subscriber. It is handed
//! a [`Telemetry`] at construction and runs every public operation inside it,
//! so embedders decide where (and whether) engine events go.

use tracing::subscriber::NoSubscriber;
use tracing::Dispatch;

/// Logging sink injected into managers and network handles
#[derive(Clone, Debug)]
pub struct Telemetry {
    dispatch: Dispatch,
}

impl Telemetry {
    /// Route engine events to the given dispatcher
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Drop all engine events
    pub fn disabled() -> Self {
        Self::new(Dispatch::new(NoSubscriber::default()))
    }

    /// Run `f` with this sink as the current dispatcher
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Metadata, Subscriber};

    struct CountingSubscriber {
        events: Arc<AtomicUsize>,
    }

    impl Subscriber for CountingSubscriber {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, _: &Event<'_>) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn test_events_reach_injected_sink() {
        let events = Arc::new(AtomicUsize::new(0));
        let telemetry = Telemetry::new(Dispatch::new(CountingSubscriber {
            events: events.clone(),
        }));

        telemetry.in_scope(|| tracing::info!("inside"));
        tracing::info!("outside");

        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_in_scope_returns_value() {
        let telemetry = Telemetry::disabled();
        assert_eq!(telemetry.in_scope(|| 41 + 1), 42);
    }
}
