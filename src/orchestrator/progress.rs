//! Progress reporting.
//!
//! The orchestrator publishes [`StatusEvent`]s; whoever drives the UI
//! subscribes with a closure or a channel.

use tokio::sync::mpsc;

use crate::orchestrator::types::StatusEvent;

/// Receives status transitions as they happen.
pub trait ProgressObserver: Send + Sync {
    fn on_status(&self, event: StatusEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn on_status(&self, event: StatusEvent) {
        self(event)
    }
}

impl ProgressObserver for mpsc::UnboundedSender<StatusEvent> {
    fn on_status(&self, event: StatusEvent) {
        // A closed receiver only means nobody is watching any more.
        let _ = self.send(event);
    }
}

/// Observer that keeps every event, in emission order.
#[derive(Debug, Default)]
pub struct StatusLog {
    events: std::sync::Mutex<Vec<StatusEvent>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ProgressObserver for StatusLog {
    fn on_status(&self, event: StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
