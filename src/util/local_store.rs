use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Key for the role → points-per-activity table.
pub const POINT_SETTINGS_KEY: &str = "agent_point_settings";
/// Key for the cached admin report summary.
pub const REPORT_SUMMARY_KEY: &str = "report_summary";

/// Cached report snapshots are considered fresh for ten minutes.
pub fn report_snapshot_ttl() -> Duration {
    Duration::minutes(10)
}

/// Device-local JSON key-value store for settings and cached report
/// snapshots. Values are cached in memory and the whole file is rewritten
/// on every set.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let cache = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    /// A stored value that fails to deserialize is treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.read().unwrap();
        cache
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let mut cache = self.cache.write().unwrap();
        cache.insert(key.to_owned(), serde_json::to_value(value)?);
        fs::write(&self.path, serde_json::to_vec_pretty(&*cache)?)?;
        Ok(())
    }
}

/// A value plus the instant it was computed, for freshness-window caching.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub stored_at: DateTime<Utc>,
    pub value: T,
}

impl<T> Snapshot<T> {
    pub fn capture(value: T) -> Self {
        Self {
            stored_at: Utc::now(),
            value,
        }
    }

    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.stored_at <= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_values_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let store = LocalStore::open(&path).unwrap();
        store.set("greeting", &"namaskaram".to_owned()).unwrap();
        assert_eq!(
            store.get::<String>("greeting").as_deref(),
            Some("namaskaram")
        );

        // A fresh handle sees what the first wrote.
        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(
            reopened.get::<String>("greeting").as_deref(),
            Some("namaskaram")
        );
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get::<String>("anything"), None);
    }

    #[test]
    fn snapshot_freshness_window() {
        let snapshot = Snapshot {
            stored_at: Utc::now() - Duration::minutes(9),
            value: 42u32,
        };
        assert!(snapshot.is_fresh(report_snapshot_ttl(), Utc::now()));

        let stale = Snapshot {
            stored_at: Utc::now() - Duration::minutes(11),
            value: 42u32,
        };
        assert!(!stale.is_fresh(report_snapshot_ttl(), Utc::now()));
    }
}
