//! On-disk cache: the last successful refresh time and a snapshot of the
//! indexed documents.
//!
//! Layout under the cache directory:
//!
//! * `last_update.txt`: RFC 3339 timestamp of the last successful refresh.
//! * `district_index.json`: the documents and raw texts, with a SHA-256
//!   checksum over their texts.
//!
//! A missing or unreadable file makes the cache stale; nothing here is
//! fatal to the store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ub_realty_property_models::DistrictDocument;

use crate::KnowledgeError;

pub const LAST_UPDATE_FILE: &str = "last_update.txt";
pub const SNAPSHOT_FILE: &str = "district_index.json";

/// Snapshot format version; bumped when the layout changes.
const SNAPSHOT_VERSION: u32 = 1;

/// How long a refresh stays fresh.
#[must_use]
pub fn freshness_window() -> Duration {
    Duration::days(7)
}

/// Whether data updated at `last_update` is still fresh at `now`. The
/// boundary is inclusive.
#[must_use]
pub fn is_fresh_at(last_update: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - last_update <= window
}

/// Freshness report for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub is_fresh: bool,
    /// Whole days since the last update, when known.
    pub age_days: Option<i64>,
    pub last_update: Option<DateTime<Utc>>,
}

impl CacheStatus {
    /// Status of a cache last updated at `last_update`, evaluated at `now`.
    #[must_use]
    pub fn at(last_update: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            is_fresh: last_update.is_some_and(|ts| is_fresh_at(ts, now, window)),
            age_days: last_update.map(|ts| (now - ts).num_days()),
            last_update,
        }
    }
}

/// Persisted index contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub documents: Vec<DistrictDocument>,
    #[serde(default)]
    pub extra_texts: Vec<String>,
    /// Hex SHA-256 over the rendered document texts and extra texts.
    pub checksum: String,
}

impl CacheSnapshot {
    #[must_use]
    pub fn new(documents: Vec<DistrictDocument>, extra_texts: Vec<String>) -> Self {
        let checksum = checksum(&documents, &extra_texts);
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            documents,
            extra_texts,
            checksum,
        }
    }

    fn verify(&self) -> Result<(), KnowledgeError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(KnowledgeError::Corrupt(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        let actual = checksum(&self.documents, &self.extra_texts);
        if actual != self.checksum {
            return Err(KnowledgeError::Corrupt(format!(
                "checksum mismatch: expected {}, got {actual}",
                self.checksum
            )));
        }
        Ok(())
    }
}

fn checksum(documents: &[DistrictDocument], extra_texts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for document in documents {
        hasher.update(document.render_text().as_bytes());
        hasher.update(b"\n");
    }
    for text in extra_texts {
        hasher.update(text.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// The cache directory.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn last_update_path(&self) -> PathBuf {
        self.root.join(LAST_UPDATE_FILE)
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    /// Reads the last refresh time.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError`] if the file cannot be read or does not
    /// hold an RFC 3339 timestamp.
    pub fn read_last_update(&self) -> Result<Option<DateTime<Utc>>, KnowledgeError> {
        let path = self.last_update_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let parsed = DateTime::parse_from_rfc3339(text.trim())?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    /// Last refresh time, treating any read or parse failure as absent.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        match self.read_last_update() {
            Ok(ts) => ts,
            Err(e) => {
                log::warn!("Ignoring unreadable {LAST_UPDATE_FILE}: {e}");
                None
            }
        }
    }

    /// Records a successful refresh.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Io`] if the directory or file cannot be
    /// written.
    pub fn write_last_update(&self, ts: DateTime<Utc>) -> Result<(), KnowledgeError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.last_update_path(), ts.to_rfc3339())?;
        Ok(())
    }

    /// Loads and verifies the snapshot. `Ok(None)` when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError`] if the file is unreadable, not valid JSON,
    /// or fails its checksum.
    pub fn load_snapshot(&self) -> Result<Option<CacheSnapshot>, KnowledgeError> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let snapshot: CacheSnapshot = serde_json::from_slice(&bytes)?;
        snapshot.verify()?;
        Ok(Some(snapshot))
    }

    /// Writes the snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError`] if serialization or the write fails.
    pub fn save_snapshot(&self, snapshot: &CacheSnapshot) -> Result<(), KnowledgeError> {
        std::fs::create_dir_all(&self.root)?;
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.snapshot_path().with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, self.snapshot_path())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ub_realty_aggregate::fallback_documents;

    use super::*;

    fn temp_cache(name: &str) -> CacheDir {
        let dir = std::env::temp_dir().join(format!("ub_realty_cache_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        CacheDir::new(dir)
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let now = Utc::now();
        let window = freshness_window();
        assert!(is_fresh_at(now - Duration::days(7), now, window));
        assert!(!is_fresh_at(
            now - Duration::days(7) - Duration::seconds(1),
            now,
            window
        ));

        let status = CacheStatus::at(Some(now - Duration::days(3)), now, window);
        assert!(status.is_fresh);
        assert_eq!(status.age_days, Some(3));

        let missing = CacheStatus::at(None, now, window);
        assert!(!missing.is_fresh);
        assert_eq!(missing.age_days, None);
    }

    #[test]
    fn timestamp_round_trips() {
        let cache = temp_cache("timestamp");
        assert_eq!(cache.read_last_update().unwrap(), None);

        let ts = Utc::now();
        cache.write_last_update(ts).unwrap();
        let read = cache.read_last_update().unwrap().unwrap();
        assert!((read - ts).num_milliseconds().abs() < 1);

        std::fs::write(cache.root().join(LAST_UPDATE_FILE), "yesterday").unwrap();
        assert!(cache.read_last_update().is_err());
        assert_eq!(cache.last_update(), None);

        std::fs::remove_dir_all(cache.root()).unwrap();
    }

    #[test]
    fn snapshot_round_trips_and_detects_tampering() {
        let cache = temp_cache("snapshot");
        assert!(cache.load_snapshot().unwrap().is_none());

        let snapshot = CacheSnapshot::new(fallback_documents(Utc::now()), vec!["extra".to_string()]);
        cache.save_snapshot(&snapshot).unwrap();
        assert_eq!(cache.load_snapshot().unwrap(), Some(snapshot.clone()));

        let mut tampered = snapshot;
        tampered.documents[0].overall_average_price_per_sqm = 1.0;
        let json = serde_json::to_vec(&tampered).unwrap();
        std::fs::write(cache.root().join(SNAPSHOT_FILE), json).unwrap();
        assert!(matches!(cache.load_snapshot(), Err(KnowledgeError::Corrupt(_))));

        std::fs::write(cache.root().join(SNAPSHOT_FILE), "{not json").unwrap();
        assert!(matches!(cache.load_snapshot(), Err(KnowledgeError::Json(_))));

        std::fs::remove_dir_all(cache.root()).unwrap();
    }
}
