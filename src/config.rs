//! Configuration for the maintenance engine
//!
//! All tunable parameters in one place with environment variable overrides.
//! Follows the principle: sensible defaults, configurable in production.

use std::env;
use std::time::Duration;

use tracing::info;

use crate::constants::{
    BACKUP_INTERVAL_SECS, MAINTENANCE_INTERVAL_SECS, OVERSIZED_ENTRY_BYTES, OVERSIZED_KEEP_ITEMS,
    PROBE_TIMEOUT_SECS, RETENTION_DAYS, STORAGE_WARNING_PERCENT,
};

/// Maintenance engine configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Interval between scheduled cycles (default: 12 hours)
    pub maintenance_interval: Duration,

    /// Storage usage percentage that triggers an early retention sweep
    /// (default: 80)
    pub storage_warning_percent: f64,

    /// Maximum snippet age before the retention sweep drops it
    /// (default: 90 days)
    pub retention_days: i64,

    /// Interval between backup snapshots (default: 7 days)
    pub backup_interval: Duration,

    /// Serialized size above which an entry is considered oversized
    /// (default: 1,000,000 bytes)
    pub oversized_entry_bytes: usize,

    /// Elements kept when an oversized array entry is capped (default: 1000)
    pub oversized_keep_items: usize,

    /// How long to wait for the capacity probe before failing the quota
    /// check (default: 5 seconds)
    pub probe_timeout: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            maintenance_interval: Duration::from_secs(MAINTENANCE_INTERVAL_SECS),
            storage_warning_percent: STORAGE_WARNING_PERCENT,
            retention_days: RETENTION_DAYS,
            backup_interval: Duration::from_secs(BACKUP_INTERVAL_SECS),
            oversized_entry_bytes: OVERSIZED_ENTRY_BYTES,
            oversized_keep_items: OVERSIZED_KEEP_ITEMS,
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
        }
    }
}

impl MaintenanceConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("CLIPVAULT_MAINTENANCE_INTERVAL_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.maintenance_interval = Duration::from_secs(n.max(1));
            }
        }

        if let Ok(val) = env::var("CLIPVAULT_STORAGE_WARNING_PERCENT") {
            if let Ok(n) = val.parse::<f64>() {
                config.storage_warning_percent = n.clamp(1.0, 100.0);
            }
        }

        if let Ok(val) = env::var("CLIPVAULT_RETENTION_DAYS") {
            if let Ok(n) = val.parse::<i64>() {
                config.retention_days = n.max(1);
            }
        }

        if let Ok(val) = env::var("CLIPVAULT_BACKUP_INTERVAL_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.backup_interval = Duration::from_secs(n.max(1));
            }
        }

        if let Ok(val) = env::var("CLIPVAULT_OVERSIZED_ENTRY_BYTES") {
            if let Ok(n) = val.parse::<usize>() {
                config.oversized_entry_bytes = n.max(1);
            }
        }

        if let Ok(val) = env::var("CLIPVAULT_OVERSIZED_KEEP_ITEMS") {
            if let Ok(n) = val.parse::<usize>() {
                config.oversized_keep_items = n.max(1);
            }
        }

        if let Ok(val) = env::var("CLIPVAULT_PROBE_TIMEOUT_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.probe_timeout = Duration::from_secs(n.max(1));
            }
        }

        config
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("Maintenance configuration:");
        info!(
            "   Cycle interval: {}h",
            self.maintenance_interval.as_secs() / 3600
        );
        info!("   Storage warning: {:.0}%", self.storage_warning_percent);
        info!("   Retention window: {} days", self.retention_days);
        info!(
            "   Backup interval: {} days",
            self.backup_interval.as_secs() / 86400
        );
        info!(
            "   Oversize cap: {} bytes -> keep {} items",
            self.oversized_entry_bytes, self.oversized_keep_items
        );
        info!("   Probe timeout: {}s", self.probe_timeout.as_secs());
    }
}

/// Environment variable documentation
#[allow(unused)] // Public API - available for CLI help output
pub fn print_env_help() {
    println!("clipvault configuration environment variables:");
    println!();
    println!("  CLIPVAULT_MAINTENANCE_INTERVAL_SECS - Seconds between cycles (default: 43200 = 12h)");
    println!("  CLIPVAULT_STORAGE_WARNING_PERCENT   - Usage percent triggering early cleanup (default: 80)");
    println!("  CLIPVAULT_RETENTION_DAYS            - Snippet retention window in days (default: 90)");
    println!("  CLIPVAULT_BACKUP_INTERVAL_SECS      - Seconds between snapshots (default: 604800 = 7d)");
    println!("  CLIPVAULT_OVERSIZED_ENTRY_BYTES     - Oversize threshold in bytes (default: 1000000)");
    println!("  CLIPVAULT_OVERSIZED_KEEP_ITEMS      - Items kept when capping (default: 1000)");
    println!("  CLIPVAULT_PROBE_TIMEOUT_SECS        - Capacity probe timeout (default: 5)");
    println!();
    println!("  RUST_LOG                            - Log level (e.g., info, debug, trace)");
    println!();
}
