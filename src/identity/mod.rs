//! User identity for stamping log entries.
//!
//! Resolution is best-effort and total: the remote lookup may degrade in any
//! way, and the caller still gets a usable, non-empty identity. Degradations
//! are written to the log as diagnostics, never returned as errors.

pub mod source;

pub use source::{HttpReply, HubIdentitySource, IdentitySource};

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::IdentityError;
use crate::storage::{KeyValueStore, LogStore, USER_ID_KEY};
use crate::telemetry::entry::{DiagnosticRecord, EntryPayload, UNKNOWN_USER};

const FALLBACK_PREFIX: &str = "user-";
const FALLBACK_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOrigin {
    /// Name reported by the identity endpoint.
    Remote,
    /// Device-local token from the key-value store.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    value: String,
    origin: IdentityOrigin,
}

impl Identity {
    pub fn remote(name: impl Into<String>) -> Self {
        Self {
            value: name.into(),
            origin: IdentityOrigin::Remote,
        }
    }

    pub fn fallback(token: impl Into<String>) -> Self {
        Self {
            value: token.into(),
            origin: IdentityOrigin::Fallback,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn origin(&self) -> IdentityOrigin {
        self.origin
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Deserialize)]
struct HubUser {
    #[serde(default)]
    name: Option<String>,
}

/// `user-` followed by nine lowercase alphanumerics. Collisions across devices
/// are unlikely, not impossible.
pub fn generate_fallback_token() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{}{}", FALLBACK_PREFIX, &raw[..FALLBACK_LEN])
}

pub struct IdentityResolver {
    source: Arc<dyn IdentitySource>,
    kv: Arc<dyn KeyValueStore>,
}

impl IdentityResolver {
    pub fn new(source: Arc<dyn IdentitySource>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self { source, kv }
    }

    /// One remote attempt, then the local fallback. Diagnostics for a degraded
    /// lookup go to `log` stamped as [`UNKNOWN_USER`].
    pub async fn resolve(&self, log: &LogStore) -> Identity {
        let diagnostic = match self.source.fetch().await {
            Ok(reply) if reply.is_success() => match serde_json::from_str::<HubUser>(&reply.body) {
                Ok(user) => match user.name.filter(|n| !n.is_empty()) {
                    Some(name) => {
                        info!("Identity resolved from hub: {}", name);
                        return Identity::remote(name);
                    }
                    None => DiagnosticRecord::failure("name not found"),
                },
                Err(e) => {
                    let malformed = IdentityError::MalformedBody(e.to_string());
                    DiagnosticRecord::error(malformed.to_string())
                }
            },
            Ok(reply) => DiagnosticRecord::failure(format!("status={}", reply.status)),
            Err(e) => DiagnosticRecord::error(e.to_string()),
        };

        warn!("Could not retrieve user id from hub: {:?} {}", diagnostic.kind, diagnostic.details);
        if let Err(e) = log.append(UNKNOWN_USER, EntryPayload::Diagnostic(diagnostic)).await {
            error!("Failed to log identity diagnostic: {}", e);
        }

        self.fallback()
    }

    /// Cached device token, created and persisted on first use.
    pub fn fallback(&self) -> Identity {
        match self.kv.get(USER_ID_KEY) {
            Ok(Some(stored)) if !stored.trim().is_empty() => return Identity::fallback(stored),
            Ok(_) => {}
            Err(e) => warn!("Cannot read cached user id: {}", e),
        }

        let token = generate_fallback_token();
        if let Err(e) = self.kv.set(USER_ID_KEY, &token) {
            // Still usable for this recorder; the next one will mint another.
            warn!("Cannot persist fallback user id: {}", e);
        }
        info!("Generated fallback user id {}", token);
        Identity::fallback(token)
    }
}
