//! Maintenance scheduler & policy engine
//!
//! Runs a recurring cycle of five independent checks over the snippet store:
//!
//! 1. Storage quota - probe usage, run an early retention sweep above 80%
//! 2. Expired data - drop snippets older than the retention window
//! 3. Backup cadence - snapshot the whole store when the last one is stale
//! 4. Performance - cap oversized array entries anywhere in the namespace
//! 5. Data validity - structural scan; on corruption, rewind to the snapshot
//!
//! The checks run concurrently and each is independently fault-tolerant: a
//! failure becomes one entry in the cycle report, never a panic and never an
//! aborted cycle. Recovery from corruption is "restore the last weekly
//! snapshot", which discards everything written since.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::backup::BackupSnapshot;
use crate::clock::Clock;
use crate::config::MaintenanceConfig;
use crate::constants::{BACKUP_KEY, LAST_BACKUP_KEY, LAST_MAINTENANCE_KEY};
use crate::errors::MaintenanceError;
use crate::quota::QuotaProbe;
use crate::store::{ContentItem, ContentStore};

/// The five checks that make up one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceCheck {
    StorageQuota,
    ExpiredData,
    BackupNeeded,
    Performance,
    DataValidity,
}

impl MaintenanceCheck {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StorageQuota => "storage_quota",
            Self::ExpiredData => "expired_data",
            Self::BackupNeeded => "backup_needed",
            Self::Performance => "performance",
            Self::DataValidity => "data_validity",
        }
    }
}

/// Result of one check within a cycle
#[derive(Debug)]
pub struct CheckOutcome {
    pub check: MaintenanceCheck,
    pub result: Result<(), MaintenanceError>,
}

/// Aggregate result of one full cycle
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcomes: Vec<CheckOutcome>,
}

impl CycleReport {
    /// True when every check succeeded
    pub fn is_healthy(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// The checks that failed this cycle
    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Outcome of the structural validity scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataValidity {
    /// Every user record and content sequence had the expected shape
    pub valid: bool,
    /// A restore from backup was performed (and succeeded)
    pub restored: bool,
}

/// The maintenance engine
///
/// Owns the policy thresholds and the cycle guard. The store handle, clock,
/// and optional capacity probe are injected so tests can substitute fakes.
pub struct MaintenanceEngine {
    store: ContentStore,
    config: MaintenanceConfig,
    clock: Arc<dyn Clock>,
    quota: Option<Arc<dyn QuotaProbe>>,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl MaintenanceEngine {
    pub fn new(store: ContentStore, config: MaintenanceConfig) -> Self {
        let clock = Arc::clone(store.clock());
        Self {
            store,
            config,
            clock,
            quota: None,
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Attach a storage capacity probe; without one the quota check is a no-op
    pub fn with_quota_probe(mut self, probe: Arc<dyn QuotaProbe>) -> Self {
        self.quota = Some(probe);
        self
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Run one full maintenance cycle
    ///
    /// The five checks run concurrently; the cycle waits for all of them and
    /// aggregates their outcomes instead of short-circuiting. Returns `None`
    /// without touching the store when a previous cycle is still in flight.
    /// `lastMaintenance` is recorded only when every check succeeded.
    pub async fn perform_maintenance(&self) -> Option<CycleReport> {
        let _guard = match self.cycle_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("maintenance cycle already in flight, skipping");
                return None;
            }
        };

        let started_at = self.clock.now();
        let started = std::time::Instant::now();

        let (quota, expired, backup, performance, validity) = tokio::join!(
            self.check_storage_quota(),
            self.cleanup_expired_data(),
            self.check_backup_needed(),
            self.optimize_performance(),
            self.validate_data(),
        );

        let outcomes = vec![
            CheckOutcome {
                check: MaintenanceCheck::StorageQuota,
                result: quota,
            },
            CheckOutcome {
                check: MaintenanceCheck::ExpiredData,
                result: expired.map(|_| ()),
            },
            CheckOutcome {
                check: MaintenanceCheck::BackupNeeded,
                result: backup,
            },
            CheckOutcome {
                check: MaintenanceCheck::Performance,
                result: performance.map(|_| ()),
            },
            CheckOutcome {
                check: MaintenanceCheck::DataValidity,
                result: validity.map(|_| ()),
            },
        ];

        let report = CycleReport {
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            outcomes,
        };

        if report.is_healthy() {
            if let Err(e) = self
                .store
                .set_scalar(LAST_MAINTENANCE_KEY, &started_at.to_rfc3339())
            {
                error!(error = %e, "failed to record maintenance timestamp");
            }
            info!(duration_ms = report.duration_ms, "maintenance cycle complete");
        } else {
            for failure in report.failures() {
                warn!(
                    check = failure.check.name(),
                    error = %failure.result.as_ref().err().map(|e| e.to_string()).unwrap_or_default(),
                    "maintenance check failed"
                );
            }
            error!(
                failed = report.failures().count(),
                duration_ms = report.duration_ms,
                "maintenance cycle completed with failures"
            );
        }

        Some(report)
    }

    /// Check storage usage against the warning threshold
    ///
    /// No-op when no capacity probe is configured. The probe is awaited under
    /// a bounded timeout so a hung host query fails this one check instead of
    /// stalling the cycle join. Above the threshold, the retention sweep runs
    /// early as remediation.
    pub async fn check_storage_quota(&self) -> Result<(), MaintenanceError> {
        let Some(probe) = &self.quota else {
            debug!("no capacity probe configured, skipping storage check");
            return Ok(());
        };

        let estimate = match tokio::time::timeout(self.config.probe_timeout, probe.estimate()).await
        {
            Err(_) => {
                return Err(MaintenanceError::ProbeTimeout {
                    waited_secs: self.config.probe_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => return Err(MaintenanceError::ProbeFailed(e.to_string())),
            Ok(Ok(estimate)) => estimate,
        };

        let percent = estimate.usage_percent();
        if percent > self.config.storage_warning_percent {
            warn!(
                usage_percent = format!("{percent:.2}"),
                "storage usage above warning threshold, running early cleanup"
            );
            let removed = self.cleanup_expired_data().await?;
            info!(removed, "early cleanup finished");
        } else {
            debug!(usage_percent = format!("{percent:.2}"), "storage usage ok");
        }

        Ok(())
    }

    /// Drop snippets older than the retention window
    ///
    /// A user's sequence is rewritten only when something was actually
    /// dropped, so the sweep is idempotent and survivors keep their original
    /// form and order. Items without a timestamp are exempt from expiry. A
    /// user whose sequence does not decode is skipped with a warning; the
    /// validity check owns recovery for that case.
    pub async fn cleanup_expired_data(&self) -> Result<usize, MaintenanceError> {
        let now = self.clock.now();
        let retention = ChronoDuration::days(self.config.retention_days);
        let users = self.store.users()?;

        let mut removed_total = 0usize;
        for username in users.keys() {
            let items = match self.store.load_content(username) {
                Ok(items) => items,
                Err(e) => {
                    warn!(user = %username, error = %e, "skipping undecodable sequence in retention sweep");
                    continue;
                }
            };

            let retained: Vec<ContentItem> = items
                .iter()
                .filter(|item| match item.timestamp() {
                    Some(t) => now.signed_duration_since(t) <= retention,
                    None => true,
                })
                .cloned()
                .collect();

            if retained.len() < items.len() {
                let removed = items.len() - retained.len();
                self.store.replace_content(username, &retained)?;
                debug!(user = %username, removed, "expired snippets removed");
                removed_total += removed;
            }
        }

        if removed_total > 0 {
            info!(removed = removed_total, "expired data cleanup complete");
        }
        Ok(removed_total)
    }

    /// Take a backup when the last one is missing, unparseable, or stale
    pub async fn check_backup_needed(&self) -> Result<(), MaintenanceError> {
        let now = self.clock.now();
        let interval = ChronoDuration::seconds(self.config.backup_interval.as_secs() as i64);

        let due = match self.store.scalar(LAST_BACKUP_KEY)? {
            None => true,
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(last) => now.signed_duration_since(last.with_timezone(&Utc)) > interval,
                Err(e) => {
                    warn!(error = %e, "unparseable lastBackup timestamp, forcing backup");
                    true
                }
            },
        };

        if due {
            self.create_backup().await?;
        } else {
            debug!("backup still fresh");
        }
        Ok(())
    }

    /// Snapshot the full user table and every content sequence
    ///
    /// Overwrites any prior snapshot; there is no backup history.
    pub async fn create_backup(&self) -> Result<(), MaintenanceError> {
        let now = self.clock.now();
        let users = self.store.users()?;

        let mut data = HashMap::new();
        for username in users.keys() {
            let items = self.store.load_content(username)?;
            data.insert(username.clone(), items);
        }

        let user_count = users.len();
        let snapshot = BackupSnapshot::new(now, users, data)?;
        let raw =
            serde_json::to_string(&snapshot).map_err(|e| MaintenanceError::Serialization {
                key: BACKUP_KEY.to_string(),
                reason: e.to_string(),
            })?;

        self.store.set_scalar(BACKUP_KEY, &raw)?;
        self.store.set_scalar(LAST_BACKUP_KEY, &now.to_rfc3339())?;

        info!(users = user_count, "backup snapshot written");
        Ok(())
    }

    /// Rewind the store to the last snapshot
    ///
    /// Returns `false` with no side effect when no snapshot exists, and
    /// `false` after logging on any parse, checksum, or storage failure.
    /// On success the store equals the snapshot exactly: the user table is
    /// rewritten wholesale and sequences for users the snapshot does not
    /// know about are removed.
    pub fn restore_from_backup(&self) -> bool {
        match self.try_restore() {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "restore from backup failed");
                false
            }
        }
    }

    fn try_restore(&self) -> anyhow::Result<bool> {
        let Some(raw) = self.store.scalar(BACKUP_KEY)? else {
            return Ok(false);
        };

        let snapshot: BackupSnapshot =
            serde_json::from_str(&raw).context("failed to parse backup snapshot")?;
        if !snapshot.verify()? {
            anyhow::bail!("backup snapshot checksum mismatch");
        }

        self.store.replace_users(&snapshot.users)?;

        for username in self.store.content_usernames()? {
            if !snapshot.data.contains_key(&username) {
                self.store.clear_content(&username)?;
            }
        }
        for (username, items) in &snapshot.data {
            self.store.replace_content(username, items)?;
        }

        info!(
            users = snapshot.users.len(),
            snapshot_time = %snapshot.timestamp,
            "store restored from backup snapshot"
        );
        Ok(true)
    }

    /// Cap oversized array entries anywhere in the namespace
    ///
    /// A blunt, format-agnostic sweep: any entry whose serialized size
    /// exceeds the threshold and whose value parses as a JSON array is
    /// truncated to its first N elements. Oversized values of any other
    /// shape are left untouched. Returns the number of entries capped.
    pub async fn optimize_performance(&self) -> Result<usize, MaintenanceError> {
        let mut capped = 0usize;

        for key in self.store.kv().keys()? {
            let Some(value) = self.store.kv().get(&key)? else {
                continue;
            };
            if value.len() <= self.config.oversized_entry_bytes {
                continue;
            }

            let parsed: Value = match serde_json::from_str(&value) {
                Ok(parsed) => parsed,
                Err(_) => {
                    debug!(key = %key, "oversized entry is not JSON, leaving untouched");
                    continue;
                }
            };
            let Value::Array(mut elements) = parsed else {
                debug!(key = %key, "oversized entry is not a sequence, leaving untouched");
                continue;
            };

            if elements.len() <= self.config.oversized_keep_items {
                continue;
            }
            elements.truncate(self.config.oversized_keep_items);

            let raw = serde_json::to_string(&Value::Array(elements)).map_err(|e| {
                MaintenanceError::Serialization {
                    key: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            self.store.kv().set(&key, &raw)?;

            info!(key = %key, kept = self.config.oversized_keep_items, "oversized entry capped");
            capped += 1;
        }

        Ok(capped)
    }

    /// Structural scan of every user record and content sequence
    ///
    /// A user is invalid when its credential hash is empty or its content
    /// does not decode to a sequence. The scan itself never mutates data;
    /// when anything is invalid, the whole store is rewound to the last
    /// snapshot once, accepting the loss of everything written since.
    pub async fn validate_data(&self) -> Result<DataValidity, MaintenanceError> {
        let users = self.store.users()?;
        let mut valid = true;

        for (username, user) in &users {
            if user.password_hash.trim().is_empty() {
                warn!(user = %username, "user record is missing its credential hash");
                valid = false;
            }
            if let Err(e) = self.store.load_content(username) {
                warn!(user = %username, error = %e, "content does not decode to a sequence");
                valid = false;
            }
        }

        let mut restored = false;
        if !valid {
            warn!("data validation failed, rewinding to last backup snapshot");
            restored = self.restore_from_backup();
        } else {
            debug!(users = users.len(), "data validation passed");
        }

        Ok(DataValidity { valid, restored })
    }

    /// Run one cycle now, then one per configured interval forever
    ///
    /// The first tick of the interval fires immediately. The task runs for
    /// the lifetime of the process unless the returned handle is aborted;
    /// overlapping cycles are skipped by the cycle guard, not queued.
    pub fn start_auto_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        info!(
            interval_secs = engine.config.maintenance_interval.as_secs(),
            "starting auto maintenance"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.config.maintenance_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if engine.perform_maintenance().await.is_none() {
                    debug!("scheduled cycle skipped, previous cycle still running");
                }
            }
        })
    }
}
