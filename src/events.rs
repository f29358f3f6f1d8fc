//! Notifications emitted when staff change a topic's view count fields.
//! Nothing in this crate depends on them beyond logging; other components
//! subscribe through `EventBus::subscribe`.

use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewCountEvent {
    CountChanged {
        topic_id: i64,
        old: i64,
        new: i64,
    },
    ToggleChanged {
        topic_id: i64,
        old: Option<bool>,
        new: bool,
    },
}

impl ViewCountEvent {
    pub fn topic_id(&self) -> i64 {
        match self {
            ViewCountEvent::CountChanged { topic_id, .. } => *topic_id,
            ViewCountEvent::ToggleChanged { topic_id, .. } => *topic_id,
        }
    }
}

pub trait ViewCountListener: Send + Sync {
    fn on_event(&self, event: &ViewCountEvent);
}

/// Writes every event to the log.
pub struct LoggingListener;

impl ViewCountListener for LoggingListener {
    fn on_event(&self, event: &ViewCountEvent) {
        match event {
            ViewCountEvent::CountChanged { topic_id, old, new } => {
                log::info!("[view-count] Custom view count changed: topic {} {} -> {}", topic_id, old, new)
            }
            ViewCountEvent::ToggleChanged { topic_id, old, new } => log::info!(
                "[view-count] Custom view count toggle changed: topic {} {:?} -> {}",
                topic_id,
                old,
                new
            ),
        }
    }
}

/// Keeps every event it receives. Handy for tests and for callers that want
/// to inspect what an edit emitted.
#[derive(Default, Clone)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ViewCountEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewCountEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl ViewCountListener for RecordingListener {
    fn on_event(&self, event: &ViewCountEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Synchronous fan-out to registered listeners, in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn ViewCountListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with the logging listener already registered.
    pub fn with_logging() -> Self {
        let mut bus = Self::new();
        bus.subscribe(LoggingListener);
        bus
    }

    pub fn subscribe<L: ViewCountListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    pub fn publish(&self, event: &ViewCountEvent) {
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_delivers_to_every_listener_in_order() {
        let first = RecordingListener::new();
        let second = RecordingListener::new();
        let mut bus = EventBus::with_logging();
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());
        assert_eq!(bus.len(), 3);

        let count = ViewCountEvent::CountChanged { topic_id: 3, old: 0, new: 12 };
        let toggle = ViewCountEvent::ToggleChanged { topic_id: 3, old: None, new: true };
        bus.publish(&count);
        bus.publish(&toggle);

        assert_eq!(first.events(), vec![count.clone(), toggle.clone()]);
        assert_eq!(second.events(), vec![count, toggle]);
    }

    #[test]
    fn event_serializes_with_tag() {
        let ev = ViewCountEvent::ToggleChanged { topic_id: 5, old: Some(false), new: true };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "toggle_changed");
        assert_eq!(json["topic_id"], 5);
        assert_eq!(ev.topic_id(), 5);
    }
}
