//! Backup snapshot model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BucketKey;
use crate::Result;

/// Current snapshot format tag.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Timestamped, device-tagged collection of every syncable bucket.
///
/// Bucket contents are raw serialized strings; the sync layer only looks
/// inside them when merging array-shaped buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format tag
    pub version: u32,
    /// Creation instant
    pub timestamp: DateTime<Utc>,
    /// Originating device, for display only
    pub device_id: String,
    /// Bucket name to raw content; `null` when the bucket was never populated
    #[serde(default)]
    pub data: BTreeMap<String, Option<String>>,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, device_id: impl Into<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp,
            device_id: device_id.into(),
            data: BTreeMap::new(),
        }
    }

    /// Raw content of a bucket, `None` when absent or `null`.
    pub fn bucket(&self, key: BucketKey) -> Option<&str> {
        self.data.get(key.as_str())?.as_deref()
    }

    pub fn set_bucket(&mut self, key: BucketKey, value: impl Into<String>) {
        self.data.insert(key.as_str().to_string(), Some(value.into()));
    }

    /// Buckets carrying a value, in key order.
    pub fn populated_buckets(&self) -> impl Iterator<Item = (BucketKey, &str)> {
        BucketKey::ALL
            .into_iter()
            .filter_map(|key| self.bucket(key).map(|value| (key, value)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
