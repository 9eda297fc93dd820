use std::fmt::Display;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::TrackingSettings;
use crate::identity::IdentityResolver;
use crate::storage::LogStore;
use crate::telemetry::events::EventTarget;
use crate::telemetry::recorder::InteractionRecorder;

/// Owns "the current recorder" on behalf of the host.
///
/// The host forwards every settings change to [`TrackingController::apply`].
/// Each change tears the running recorder down and, if tracking is still
/// enabled, builds a fresh one; recorders are never reconfigured in place.
pub struct TrackingController {
    target: Arc<dyn EventTarget>,
    resolver: Arc<IdentityResolver>,
    log: LogStore,
    current: Option<InteractionRecorder>,
}

impl TrackingController {
    pub fn new(
        target: Arc<dyn EventTarget>,
        resolver: Arc<IdentityResolver>,
        log: LogStore,
    ) -> Self {
        Self {
            target,
            resolver,
            log,
            current: None,
        }
    }

    /// `None` means the host has no stored settings, which is treated the
    /// same as tracking switched off.
    pub async fn apply(&mut self, settings: Option<&TrackingSettings>) {
        self.shutdown();

        let settings = match settings {
            None => {
                info!("No tracking settings found; tracking disabled");
                return;
            }
            Some(s) if !s.enable_tracking => {
                info!("Tracking disabled by settings");
                return;
            }
            Some(s) => s,
        };

        let mut recorder = InteractionRecorder::new(
            settings.included_events.iter().cloned(),
            Arc::clone(&self.target),
            Arc::clone(&self.resolver),
            self.log.clone(),
        );
        recorder.init().await;
        self.current = Some(recorder);
    }

    /// For hosts whose settings load can fail. A failed load leaves tracking off.
    pub async fn apply_load_result<E: Display>(
        &mut self,
        loaded: Result<Option<TrackingSettings>, E>,
    ) {
        match loaded {
            Ok(settings) => self.apply(settings.as_ref()).await,
            Err(e) => {
                error!("Failed to load tracking settings: {}", e);
                self.shutdown();
            }
        }
    }

    /// Detach and drop the running recorder, if any.
    pub fn shutdown(&mut self) {
        if let Some(mut recorder) = self.current.take() {
            recorder.detach();
        }
    }

    pub fn recorder(&self) -> Option<&InteractionRecorder> {
        self.current.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.current.as_ref().is_some_and(|r| r.is_initialized())
    }

    /// Wait for in-flight appends of the running recorder.
    pub async fn flush(&self) {
        if let Some(recorder) = &self.current {
            recorder.flush().await;
        }
    }
}
