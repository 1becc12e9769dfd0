//! Backup snapshot schema and integrity checking
//!
//! The vault keeps exactly one snapshot at a time: the full user table plus
//! every user's content sequence, overwritten on each backup. A SHA-256
//! checksum over the canonical serialization lets restore refuse a snapshot
//! that was corrupted in storage.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::store::{ContentItem, UserRecord};

/// The single backup artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Full user table at backup time
    pub users: HashMap<String, UserRecord>,
    /// Every user's content sequence at backup time
    pub data: HashMap<String, Vec<ContentItem>>,
    /// SHA-256 over the canonical serialization of `users` + `data`.
    /// Absent on snapshots written before checksums existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl BackupSnapshot {
    /// Build a snapshot with its checksum filled in
    pub fn new(
        timestamp: DateTime<Utc>,
        users: HashMap<String, UserRecord>,
        data: HashMap<String, Vec<ContentItem>>,
    ) -> Result<Self> {
        let mut snapshot = Self {
            timestamp,
            users,
            data,
            checksum: None,
        };
        snapshot.checksum = Some(snapshot.compute_checksum()?);
        Ok(snapshot)
    }

    /// Checksum over users and data in sorted-key order
    ///
    /// HashMap iteration order is not deterministic, so the maps are viewed
    /// through BTreeMaps before hashing. The timestamp is excluded: two
    /// snapshots of the same state taken at different times hash the same.
    pub fn compute_checksum(&self) -> Result<String> {
        let users: BTreeMap<&String, &UserRecord> = self.users.iter().collect();
        let data: BTreeMap<&String, &Vec<ContentItem>> = self.data.iter().collect();

        let canonical = serde_json::to_vec(&(users, data))
            .context("failed to serialize snapshot for checksumming")?;

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let digest = hasher.finalize();
        Ok(format!("{digest:x}"))
    }

    /// Verify the stored checksum
    ///
    /// Snapshots without a checksum pass verification unconditionally.
    pub fn verify(&self) -> Result<bool> {
        match &self.checksum {
            Some(stored) => Ok(*stored == self.compute_checksum()?),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> BackupSnapshot {
        let mut users = HashMap::new();
        users.insert(
            "alice".to_string(),
            UserRecord {
                username: "alice".to_string(),
                password_hash: "phc-string".to_string(),
            },
        );
        let mut data = HashMap::new();
        data.insert(
            "alice".to_string(),
            vec![ContentItem::Text("snippet".to_string())],
        );
        BackupSnapshot::new(Utc::now(), users, data).unwrap()
    }

    #[test]
    fn test_snapshot_roundtrip_verifies() {
        let snapshot = sample_snapshot();
        let raw = serde_json::to_string(&snapshot).unwrap();
        let parsed: BackupSnapshot = serde_json::from_str(&raw).unwrap();

        assert!(parsed.verify().unwrap());
        assert_eq!(parsed.users, snapshot.users);
        assert_eq!(parsed.data, snapshot.data);
    }

    #[test]
    fn test_tampered_snapshot_fails_verification() {
        let mut snapshot = sample_snapshot();
        snapshot.data.insert(
            "mallory".to_string(),
            vec![ContentItem::Text("injected".to_string())],
        );
        assert!(!snapshot.verify().unwrap());
    }

    #[test]
    fn test_legacy_snapshot_without_checksum_passes() {
        let mut snapshot = sample_snapshot();
        snapshot.checksum = None;
        assert!(snapshot.verify().unwrap());
    }
}
