//! clipvault - user-scoped snippet vault with a best-effort maintenance engine
//!
//! Users store, copy, and delete short text snippets; a maintenance engine
//! keeps the store healthy on a fixed cadence.
//!
//! # Key Features
//! - Injected key-value store seam (in-memory or single-file JSON)
//! - Five concurrent maintenance checks: quota, expiry, backup cadence,
//!   oversize capping, structural validation
//! - Single-snapshot backup/restore with integrity checksums
//! - Argon2id credential hashing for the account layer
//!
//! # Failure Model
//! Maintenance is best-effort: a failing check becomes one entry in the
//! cycle report, never a crash, and corruption recovery is "rewind to the
//! last snapshot".

pub mod auth;
pub mod backup;
pub mod clock;
pub mod config;
pub mod constants;
pub mod errors;
pub mod maintenance;
pub mod quota;
pub mod store;
pub mod tracing_setup;
pub mod validation;

// Re-export dependencies to ensure tests use the same version
pub use chrono;
pub use parking_lot;

pub use auth::{AuthError, Authenticator};
pub use backup::BackupSnapshot;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MaintenanceConfig;
pub use errors::MaintenanceError;
pub use maintenance::{CycleReport, DataValidity, MaintenanceCheck, MaintenanceEngine};
pub use quota::{KvUsageProbe, QuotaProbe, StorageEstimate};
pub use store::{ContentItem, ContentStore, JsonFileStore, KvStore, MemoryKvStore, UserRecord};
