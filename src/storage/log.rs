use std::sync::Arc;

use tracing::debug;

use super::{KeyValueStore, INTERACTIONS_KEY};
use crate::error::StoreError;
use crate::telemetry::entry::{EntryPayload, LogEntry};

/// Structured view over the `user_interactions` key.
///
/// The whole sequence lives in one value, so every append is a full
/// read-modify-write. There is no locking or versioning across writers: two
/// appends that both read before either writes will keep only the later
/// write (one entry lost). An append never yields, so on a current-thread
/// runtime appends cannot interleave. The log also grows without bound.
#[derive(Clone)]
pub struct LogStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LogStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Stamp `payload` with `user_id` and the current time, then persist it.
    pub async fn append(
        &self,
        user_id: &str,
        payload: EntryPayload,
    ) -> Result<LogEntry, StoreError> {
        let entry = LogEntry::new(user_id, payload);
        debug!("Log entry: {}", serde_json::to_string(&entry)?);

        let mut entries = self.entries()?;
        entries.push(entry.clone());
        self.kv.set(INTERACTIONS_KEY, &serde_json::to_string(&entries)?)?;

        Ok(entry)
    }

    /// Persisted entries in append order. Empty when nothing was written yet.
    pub fn entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        match self.kv.get(INTERACTIONS_KEY)? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::CorruptLog {
                key: INTERACTIONS_KEY.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.remove(INTERACTIONS_KEY)
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore").field("key", &INTERACTIONS_KEY).finish()
    }
}
