pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod telemetry;
pub mod tracking;

// Re-export specific items for convenient access
pub use config::{CollectorConfig, TrackingSettings};
pub use identity::{Identity, IdentityResolver};
pub use storage::{FileStore, KeyValueStore, LogStore, MemoryStore};
pub use telemetry::recorder::InteractionRecorder;
pub use tracking::TrackingController;
