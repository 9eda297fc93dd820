use std::sync::{Arc, OnceLock};

use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::entry::{EntryPayload, InteractionRecord, LogEntry, UNKNOWN_USER};
use super::events::{EventTarget, Handler, InteractionEvent};
use crate::error::StoreError;
use crate::identity::{Identity, IdentityResolver};
use crate::storage::LogStore;

/// Listeners are registered for the capture phase so inner handlers that
/// stop propagation cannot hide events from us.
pub const USE_CAPTURE: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Uninitialized,
    /// Identity lookup in flight.
    Initializing,
    /// Listeners attached (possibly zero of them).
    Active,
}

/// The part the listener closure needs. Shared with in-flight appends.
struct RecorderCore {
    identity: OnceLock<Identity>,
    log: LogStore,
    pending: TaskTracker,
}

impl RecorderCore {
    fn user_id(&self) -> &str {
        self.identity.get().map(Identity::as_str).unwrap_or(UNKNOWN_USER)
    }

    async fn append_log(&self, payload: EntryPayload) -> Result<LogEntry, StoreError> {
        self.log.append(self.user_id(), payload).await
    }
}

/// Pull the loggable fields out of an event. Empty id/class are dropped.
pub fn capture_interaction(event: &InteractionEvent) -> InteractionRecord {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    InteractionRecord {
        event_type: event.event_type.clone(),
        target: event.target.tag_name.clone(),
        target_id: non_empty(&event.target.id),
        target_class: non_empty(&event.target.class_name),
    }
}

/// Attaches to an [`EventTarget`] for a fixed set of event types and logs
/// every interaction it sees.
///
/// The event set is fixed for the lifetime of the recorder; reconfiguring
/// means detaching this one and building another.
pub struct InteractionRecorder {
    included_events: Vec<String>,
    active_event_types: Vec<String>,
    state: RecorderState,
    target: Arc<dyn EventTarget>,
    resolver: Arc<IdentityResolver>,
    core: Arc<RecorderCore>,
    // Retained so unsubscribe sees the same allocation subscribe did.
    handler: Handler,
}

impl InteractionRecorder {
    pub fn new<I, S>(
        included_events: I,
        target: Arc<dyn EventTarget>,
        resolver: Arc<IdentityResolver>,
        log: LogStore,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<String> = Vec::new();
        for event_type in included_events.into_iter().map(Into::into) {
            if !events.contains(&event_type) {
                events.push(event_type);
            }
        }

        let core = Arc::new(RecorderCore {
            identity: OnceLock::new(),
            log,
            pending: TaskTracker::new(),
        });

        Self {
            included_events: events,
            active_event_types: Vec::new(),
            state: RecorderState::Uninitialized,
            target,
            resolver,
            handler: Self::make_handler(&core),
            core,
        }
    }

    fn make_handler(core: &Arc<RecorderCore>) -> Handler {
        let core = Arc::clone(core);
        Arc::new(move |event: &InteractionEvent| {
            let record = capture_interaction(event);

            // Dispatch is synchronous and belongs to the host; nothing here may
            // panic or block it.
            if tokio::runtime::Handle::try_current().is_err() {
                error!(
                    "Error logging interaction: no async runtime, dropping {} event",
                    record.event_type
                );
                return;
            }

            let task_core = Arc::clone(&core);
            core.pending.spawn(async move {
                if let Err(e) = task_core.append_log(EntryPayload::Interaction(record)).await {
                    error!("Error logging interaction: {}", e);
                }
            });
        })
    }

    /// Resolve identity (first time only), then attach listeners.
    /// Calling this on a recorder that is not `Uninitialized` does nothing.
    pub async fn init(&mut self) {
        if self.state != RecorderState::Uninitialized {
            debug!("Recorder already initialized, ignoring init");
            return;
        }
        self.state = RecorderState::Initializing;

        if self.core.identity.get().is_none() {
            let identity = self.resolver.resolve(&self.core.log).await;
            info!("Recorder identity: {} ({:?})", identity, identity.origin());
            let _ = self.core.identity.set(identity);
        }

        self.attach_listeners();
        self.state = RecorderState::Active;
    }

    fn attach_listeners(&mut self) {
        if self.included_events.is_empty() {
            warn!("No events included for logging.");
            return;
        }
        for event_type in &self.included_events {
            self.target.subscribe(event_type, &self.handler, USE_CAPTURE);
        }
        self.active_event_types = self.included_events.clone();
        info!("Recorder initialized. Listening to events: {:?}", self.active_event_types);
    }

    /// Remove exactly the listeners this recorder attached. Safe to repeat.
    pub fn detach(&mut self) {
        for event_type in &self.active_event_types {
            self.target.unsubscribe(event_type, &self.handler, USE_CAPTURE);
        }
        if !self.active_event_types.is_empty() {
            info!("Recorder stopped. Removed listeners for events: {:?}", self.active_event_types);
        }
        self.active_event_types.clear();
        self.state = RecorderState::Uninitialized;
    }

    /// Stamp and persist one entry with the current identity.
    pub async fn append_log(&self, payload: EntryPayload) -> Result<LogEntry, StoreError> {
        self.core.append_log(payload).await
    }

    /// Wait until every append spawned by the listener so far has finished.
    pub async fn flush(&self) {
        self.core.pending.close();
        self.core.pending.wait().await;
        self.core.pending.reopen();
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == RecorderState::Active
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.core.identity.get()
    }

    pub fn included_events(&self) -> &[String] {
        &self.included_events
    }

    pub fn active_event_types(&self) -> &[String] {
        &self.active_event_types
    }

    pub fn log(&self) -> &LogStore {
        &self.core.log
    }
}

impl Drop for InteractionRecorder {
    fn drop(&mut self) {
        // Listeners must not outlive the recorder that owns the handler.
        if !self.active_event_types.is_empty() {
            self.detach();
        }
    }
}
