use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use clap::ValueEnum;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct SessionKey {
    pub key: String,
    #[serde(flatten)]
    pub meta: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct KeyFile {
    #[serde(rename = "sessionKeys", default)]
    session_keys: Vec<SessionKey>,
}

#[derive(Debug, Default)]
pub struct PoolSnapshot {
    pub keys: Vec<SessionKey>,
    pub source_mtime: Option<SystemTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectionPolicy {
    TimeRoundRobin,
    Random,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no session keys available")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub struct KeyPool {
    path: PathBuf,
    snapshot: ArcSwap<PoolSnapshot>,
}

impl KeyPool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: ArcSwap::from_pointee(PoolSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> Arc<PoolSnapshot> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn select(&self, policy: SelectionPolicy) -> Result<SessionKey, PoolError> {
        self.select_at(policy, now_epoch_seconds())
    }

    pub(crate) fn select_at(
        &self,
        policy: SelectionPolicy,
        now_secs: u64,
    ) -> Result<SessionKey, PoolError> {
        let snapshot = self.snapshot.load();
        if snapshot.keys.is_empty() {
            return Err(PoolError::Empty);
        }
        let key = match policy {
            SelectionPolicy::TimeRoundRobin => {
                let index = (now_secs % snapshot.keys.len() as u64) as usize;
                &snapshot.keys[index]
            }
            SelectionPolicy::Random => snapshot
                .keys
                .choose(&mut rand::rng())
                .unwrap_or(&snapshot.keys[0]),
        };
        Ok(key.clone())
    }

    /// Re-reads the key file when its mtime advanced past the current
    /// snapshot's. Publishes a fully-formed replacement snapshot; on failure
    /// the prior snapshot stays live.
    pub async fn reload(&self) -> Result<bool, ReloadError> {
        let metadata =
            tokio::fs::metadata(&self.path)
                .await
                .map_err(|source| ReloadError::Read {
                    path: self.path.clone(),
                    source,
                })?;
        let mtime = metadata.modified().map_err(|source| ReloadError::Read {
            path: self.path.clone(),
            source,
        })?;
        if let Some(seen) = self.snapshot.load().source_mtime
            && mtime <= seen
        {
            return Ok(false);
        }

        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ReloadError::Read {
                path: self.path.clone(),
                source,
            })?;
        let parsed: KeyFile =
            serde_json::from_slice(&raw).map_err(|source| ReloadError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let count = parsed.session_keys.len();
        self.snapshot.store(Arc::new(PoolSnapshot {
            keys: parsed.session_keys,
            source_mtime: Some(mtime),
        }));
        info!(count, path = %self.path.display(), "session keys loaded");
        Ok(true)
    }
}

/// Periodic reload task; sole writer of the pool snapshot. Reload failures
/// are logged and never surfaced to request handlers.
pub async fn refresh_loop(
    pool: Arc<KeyPool>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = pool.reload().await {
                    error!(error = %err, "session key reload failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

pub(crate) fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;

    fn pool_with_keys(keys: &[&str]) -> KeyPool {
        let keys = keys
            .iter()
            .map(|key| SessionKey {
                key: key.to_string(),
                meta: serde_json::Map::new(),
            })
            .collect();
        KeyPool {
            path: PathBuf::from("unused"),
            snapshot: ArcSwap::from_pointee(PoolSnapshot {
                keys,
                source_mtime: None,
            }),
        }
    }

    #[test]
    fn round_robin_index_is_time_mod_len() {
        for len in 1..=5usize {
            let names: Vec<String> = (0..len).map(|i| format!("sk-{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let pool = pool_with_keys(&refs);
            for t in [0u64, 1, 7, 59, 60, 61, 3601, 1_700_000_000] {
                let selected = pool.select_at(SelectionPolicy::TimeRoundRobin, t).unwrap();
                assert_eq!(selected.key, names[(t % len as u64) as usize]);
            }
        }
    }

    #[test]
    fn round_robin_is_stable_within_a_second() {
        let pool = pool_with_keys(&["a", "b", "c"]);
        let first = pool.select_at(SelectionPolicy::TimeRoundRobin, 42).unwrap();
        for _ in 0..10 {
            let again = pool.select_at(SelectionPolicy::TimeRoundRobin, 42).unwrap();
            assert_eq!(again.key, first.key);
        }
    }

    #[test]
    fn random_selection_stays_in_pool() {
        let pool = pool_with_keys(&["a", "b"]);
        for _ in 0..50 {
            let selected = pool.select(SelectionPolicy::Random).unwrap();
            assert!(selected.key == "a" || selected.key == "b");
        }
    }

    #[test]
    fn empty_pool_selection_fails() {
        let pool = pool_with_keys(&[]);
        assert!(matches!(
            pool.select(SelectionPolicy::TimeRoundRobin),
            Err(PoolError::Empty)
        ));
        assert!(matches!(
            pool.select(SelectionPolicy::Random),
            Err(PoolError::Empty)
        ));
    }

    fn write_keys(path: &std::path::Path, keys: &[&str]) {
        let entries: Vec<JsonValue> = keys
            .iter()
            .map(|key| serde_json::json!({"key": key, "label": "test"}))
            .collect();
        fs::write(
            path,
            serde_json::to_vec(&serde_json::json!({"sessionKeys": entries})).unwrap(),
        )
        .unwrap();
    }

    fn bump_mtime(path: &std::path::Path, forward: Duration) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        let mtime = file.metadata().unwrap().modified().unwrap();
        file.set_modified(mtime + forward).unwrap();
    }

    #[tokio::test]
    async fn reload_publishes_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionKeys.json");
        write_keys(&path, &["sk-1", "sk-2"]);

        let pool = KeyPool::new(&path);
        assert!(pool.reload().await.unwrap());
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.snapshot().keys[0].key, "sk-1");
    }

    #[tokio::test]
    async fn reload_is_noop_when_mtime_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionKeys.json");
        write_keys(&path, &["sk-1"]);

        let pool = KeyPool::new(&path);
        assert!(pool.reload().await.unwrap());
        let before = pool.snapshot();

        assert!(!pool.reload().await.unwrap());
        assert!(Arc::ptr_eq(&before, &pool.snapshot()));
    }

    #[tokio::test]
    async fn reload_picks_up_advanced_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionKeys.json");
        write_keys(&path, &["sk-1"]);

        let pool = KeyPool::new(&path);
        assert!(pool.reload().await.unwrap());

        write_keys(&path, &["sk-1", "sk-2", "sk-3"]);
        bump_mtime(&path, Duration::from_secs(2));
        assert!(pool.reload().await.unwrap());
        assert_eq!(pool.len(), 3);
    }

    #[tokio::test]
    async fn failed_reload_keeps_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionKeys.json");
        write_keys(&path, &["sk-1", "sk-2"]);

        let pool = KeyPool::new(&path);
        assert!(pool.reload().await.unwrap());

        fs::write(&path, b"{ not json").unwrap();
        bump_mtime(&path, Duration::from_secs(2));
        assert!(matches!(
            pool.reload().await,
            Err(ReloadError::Parse { .. })
        ));
        assert_eq!(pool.len(), 2);

        write_keys(&path, &["sk-9"]);
        bump_mtime(&path, Duration::from_secs(4));
        assert!(pool.reload().await.unwrap());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.snapshot().keys[0].key, "sk-9");
    }

    #[tokio::test]
    async fn missing_file_reload_fails_and_pool_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pool = KeyPool::new(dir.path().join("absent.json"));
        assert!(matches!(pool.reload().await, Err(ReloadError::Read { .. })));
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn old_snapshot_survives_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionKeys.json");
        write_keys(&path, &["sk-1", "sk-2"]);

        let pool = KeyPool::new(&path);
        pool.reload().await.unwrap();
        let held = pool.snapshot();

        write_keys(&path, &["sk-9"]);
        bump_mtime(&path, Duration::from_secs(2));
        pool.reload().await.unwrap();

        // A reader holding the old snapshot still sees it whole.
        assert_eq!(held.keys.len(), 2);
        assert_eq!(pool.len(), 1);
    }
}
