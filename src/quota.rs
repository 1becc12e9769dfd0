//! Storage capacity probing
//!
//! The host may or may not be able to report how full the store is. When a
//! probe is configured, the quota check compares usage against the warning
//! threshold; when none is, the check is a silent no-op (capability
//! unavailable). The probe is async so slow hosts can be awaited under a
//! bounded timeout instead of stalling the cycle.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::store::KvStore;

/// Usage-versus-capacity report from the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageEstimate {
    pub usage_bytes: u64,
    pub quota_bytes: u64,
}

impl StorageEstimate {
    /// Usage as a percentage of quota (0 when quota is unknown/zero)
    pub fn usage_percent(&self) -> f64 {
        if self.quota_bytes == 0 {
            0.0
        } else {
            self.usage_bytes as f64 / self.quota_bytes as f64 * 100.0
        }
    }
}

/// Source of storage capacity estimates
#[async_trait]
pub trait QuotaProbe: Send + Sync {
    async fn estimate(&self) -> Result<StorageEstimate>;
}

/// Probe that measures the store itself against a configured byte capacity
///
/// Usage is the sum of serialized key and value sizes across the namespace.
pub struct KvUsageProbe {
    kv: Arc<dyn KvStore>,
    quota_bytes: u64,
}

impl KvUsageProbe {
    pub fn new(kv: Arc<dyn KvStore>, quota_bytes: u64) -> Self {
        Self { kv, quota_bytes }
    }
}

#[async_trait]
impl QuotaProbe for KvUsageProbe {
    async fn estimate(&self) -> Result<StorageEstimate> {
        let mut usage_bytes = 0u64;
        for key in self.kv.keys()? {
            usage_bytes += key.len() as u64;
            if let Some(value) = self.kv.get(&key)? {
                usage_bytes += value.len() as u64;
            }
        }
        Ok(StorageEstimate {
            usage_bytes,
            quota_bytes: self.quota_bytes,
        })
    }
}
