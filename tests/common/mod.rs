//! Shared test helpers.

#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use interlog::error::IdentityError;
use interlog::identity::{HttpReply, IdentityResolver, IdentitySource};
use interlog::storage::{KeyValueStore, LogStore, MemoryStore};
use interlog::telemetry::events::{ElementInfo, EventHub, InteractionEvent};
use interlog::telemetry::recorder::InteractionRecorder;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// What the fake identity endpoint does on every call.
#[derive(Clone)]
pub enum Script {
    Reply(u16, String),
    Fail(String),
}

pub struct ScriptedSource {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn name(name: &str) -> Arc<Self> {
        Self::new(Script::Reply(200, format!(r#"{{"name":"{}"}}"#, name)))
    }

    pub fn status(status: u16) -> Arc<Self> {
        Self::new(Script::Reply(status, String::new()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentitySource for ScriptedSource {
    async fn fetch(&self) -> Result<HttpReply, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(status, body) => Ok(HttpReply::new(*status, body.clone())),
            Script::Fail(reason) => Err(IdentityError::Transport(reason.clone())),
        }
    }
}

/// Everything a recorder needs, sharing one in-memory store.
pub struct Harness {
    pub hub: Arc<EventHub>,
    pub kv: Arc<dyn KeyValueStore>,
    pub log: LogStore,
    pub source: Arc<ScriptedSource>,
    pub resolver: Arc<IdentityResolver>,
}

impl Harness {
    pub fn new(source: Arc<ScriptedSource>) -> Self {
        Self::with_store(source, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(source: Arc<ScriptedSource>, kv: Arc<dyn KeyValueStore>) -> Self {
        let resolver = Arc::new(IdentityResolver::new(source.clone(), Arc::clone(&kv)));
        Self {
            hub: Arc::new(EventHub::new()),
            log: LogStore::new(Arc::clone(&kv)),
            kv,
            source,
            resolver,
        }
    }

    pub fn recorder(&self, events: &[&str]) -> InteractionRecorder {
        InteractionRecorder::new(
            events.iter().copied(),
            self.hub.clone(),
            Arc::clone(&self.resolver),
            self.log.clone(),
        )
    }
}

pub fn click_on_button() -> InteractionEvent {
    InteractionEvent::new("click", ElementInfo::new("BUTTON").with_id("b1").with_class("c1"))
}

/// Messages of every `WARN` event seen on this thread while the guard lives.
#[derive(Clone, Default)]
pub struct Warnings(Arc<Mutex<Vec<String>>>);

impl Warnings {
    pub fn capture() -> (Self, DefaultGuard) {
        let warnings = Self::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (warnings, guard)
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for Warnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }
}
