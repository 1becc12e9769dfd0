//! Documented constants for the snippet vault
//!
//! This module contains all tunable parameters with justification for their values.
//! Centralizing constants prevents magic numbers and makes tuning easier.

// =============================================================================
// MAINTENANCE CADENCE
// =============================================================================

/// Interval between scheduled maintenance cycles (seconds)
///
/// Justification:
/// - 12 hours keeps bookkeeping fresh without waking the process constantly
/// - Twice-daily cycles bound the staleness of quota and validity checks
///   to half a day, which is plenty for a single-writer snippet store
pub const MAINTENANCE_INTERVAL_SECS: u64 = 12 * 60 * 60;

/// Storage usage percentage that triggers an early retention sweep
///
/// Justification:
/// - 80% leaves enough headroom to finish a sweep before writes start failing
/// - Below this, cleanup only runs on its own schedule
pub const STORAGE_WARNING_PERCENT: f64 = 80.0;

/// Maximum age of a snippet before it is eligible for removal (days)
///
/// Snippets older than this are dropped by the retention sweep. Items that
/// carry no timestamp (legacy entries) are exempt from expiry.
pub const RETENTION_DAYS: i64 = 90;

/// Interval between backup snapshots (seconds)
///
/// Justification:
/// - Weekly snapshots bound worst-case data loss on corruption to 7 days
/// - The snapshot is a single overwritten artifact, so a shorter cadence
///   buys recency but no extra history
pub const BACKUP_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// How long to wait for the storage capacity probe before giving up (seconds)
///
/// A hung probe would otherwise stall the whole cycle join. 5 seconds is
/// generous for what amounts to summing value sizes or a statfs call.
pub const PROBE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// CONTENT LIMITS
// =============================================================================

/// Maximum snippets retained per user
///
/// New snippets are prepended; anything past this count falls off the end.
pub const MAX_ITEMS_PER_USER: usize = 1000;

/// Maximum characters stored per snippet
///
/// Longer snippets are truncated at write time, not rejected.
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Serialized size above which a stored entry is considered oversized (bytes)
///
/// The performance sweep caps any entry above this that deserializes to a
/// JSON array. Entries of any other shape are left untouched.
pub const OVERSIZED_ENTRY_BYTES: usize = 1_000_000;

/// Elements kept when an oversized array entry is capped
///
/// Matches [`MAX_ITEMS_PER_USER`]: sequences are newest-first, so keeping
/// the head keeps the most recent entries.
pub const OVERSIZED_KEEP_ITEMS: usize = 1000;

// =============================================================================
// STORAGE KEYS
// Every persisted value lives under one of these string keys. Per-user
// content keys are CONTENT_KEY_PREFIX + username.
// =============================================================================

/// User credential table (JSON map of username -> record)
pub const USERS_KEY: &str = "clipboard_users";

/// Prefix for per-user content sequences (JSON array)
pub const CONTENT_KEY_PREFIX: &str = "clipboard_data_";

/// Currently signed-in user record (JSON object)
pub const CURRENT_USER_KEY: &str = "clipboard_current_user";

/// RFC-3339 timestamp of the last fully successful maintenance cycle
pub const LAST_MAINTENANCE_KEY: &str = "lastMaintenance";

/// RFC-3339 timestamp of the last backup snapshot
pub const LAST_BACKUP_KEY: &str = "lastBackup";

/// The single serialized backup snapshot
pub const BACKUP_KEY: &str = "clipboardBackup";
