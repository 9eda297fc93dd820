use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::error;

/// The element an event was dispatched to. Absent attributes are empty
/// strings, the way a DOM element reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementInfo {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
}

impl ElementInfo {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub target: ElementInfo,
}

impl InteractionEvent {
    pub fn new(event_type: impl Into<String>, target: ElementInfo) -> Self {
        Self {
            event_type: event_type.into(),
            target,
        }
    }
}

/// A listener. Removal matches on the `Arc` allocation, so callers must keep
/// the value they subscribed with.
pub type Handler = Arc<dyn Fn(&InteractionEvent) + Send + Sync>;

pub fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Capability to listen on some event source.
///
/// Subscribing the same `(event_type, handler, use_capture)` twice must be a
/// no-op; unsubscribing something never subscribed must be a no-op too.
pub trait EventTarget: Send + Sync {
    fn subscribe(&self, event_type: &str, handler: &Handler, use_capture: bool);
    fn unsubscribe(&self, event_type: &str, handler: &Handler, use_capture: bool);
}

struct Listener {
    event_type: String,
    handler: Handler,
    use_capture: bool,
}

impl Listener {
    fn is(&self, event_type: &str, handler: &Handler, use_capture: bool) -> bool {
        self.event_type == event_type
            && self.use_capture == use_capture
            && same_handler(&self.handler, handler)
    }
}

/// In-process event source. Capture listeners run before bubble listeners,
/// each group in registration order.
#[derive(Default)]
pub struct EventHub {
    listeners: Mutex<Vec<Listener>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn listener_count_for(&self, event_type: &str) -> usize {
        self.listeners
            .lock()
            .map(|l| l.iter().filter(|x| x.event_type == event_type).count())
            .unwrap_or(0)
    }

    /// Registered event types in registration order (may repeat across phases).
    pub fn subscribed_types(&self) -> Vec<String> {
        self.listeners
            .lock()
            .map(|l| l.iter().map(|x| x.event_type.clone()).collect())
            .unwrap_or_default()
    }

    /// Deliver `event` to every listener of its type. Returns how many ran.
    pub fn dispatch(&self, event: &InteractionEvent) -> usize {
        // Snapshot first so handlers may (un)subscribe without deadlocking.
        let targets: Vec<Handler> = match self.listeners.lock() {
            Ok(listeners) => {
                let mut capture = Vec::new();
                let mut bubble = Vec::new();
                for l in listeners.iter().filter(|l| l.event_type == event.event_type) {
                    if l.use_capture {
                        capture.push(Arc::clone(&l.handler));
                    } else {
                        bubble.push(Arc::clone(&l.handler));
                    }
                }
                capture.extend(bubble);
                capture
            }
            Err(_) => {
                error!("event hub lock poisoned; dropping {} event", event.event_type);
                return 0;
            }
        };

        for handler in &targets {
            handler(event);
        }
        targets.len()
    }
}

impl EventTarget for EventHub {
    fn subscribe(&self, event_type: &str, handler: &Handler, use_capture: bool) {
        let Ok(mut listeners) = self.listeners.lock() else {
            error!("event hub lock poisoned; cannot subscribe {}", event_type);
            return;
        };
        let exists = listeners.iter().any(|l| l.is(event_type, handler, use_capture));
        if !exists {
            listeners.push(Listener {
                event_type: event_type.to_string(),
                handler: Arc::clone(handler),
                use_capture,
            });
        }
    }

    fn unsubscribe(&self, event_type: &str, handler: &Handler, use_capture: bool) {
        let Ok(mut listeners) = self.listeners.lock() else {
            error!("event hub lock poisoned; cannot unsubscribe {}", event_type);
            return;
        };
        listeners.retain(|l| !l.is(event_type, handler, use_capture));
    }
}
