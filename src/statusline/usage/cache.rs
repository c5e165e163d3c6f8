//! On-disk cache of the last usage snapshot.

use super::{UsageData, UsageLimit};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub const CACHE_FILENAME: &str = "usage_limits.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CachedLimits {
    session: Option<UsageLimit>,
    weekly: Option<UsageLimit>,
    sonnet: Option<UsageLimit>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    /// Absent when no fetch has succeeded yet.
    #[serde(default)]
    data: Option<CachedLimits>,
    #[serde(default)]
    fetched_at: Option<DateTime<Utc>>,
    /// Older cache files only carry `fetched_at`.
    #[serde(default)]
    attempted_at: Option<DateTime<Utc>>,
}

/// A cache hit: when a refresh was last attempted, plus any data it left.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedUsage {
    pub data: Option<UsageData>,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UsageCache {
    path: PathBuf,
    rate_limit: Duration,
}

impl UsageCache {
    pub fn new(cache_dir: &Path, rate_limit_secs: u64) -> Self {
        Self {
            path: cache_dir.join(CACHE_FILENAME),
            rate_limit: Duration::seconds(i64::from(
                u32::try_from(rate_limit_secs).unwrap_or(u32::MAX),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable cache files are treated as empty.
    pub fn load(&self) -> Option<CachedUsage> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let file: CacheFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                debug!("Ignoring corrupt usage cache {}: {e}", self.path.display());
                return None;
            }
        };
        let attempted_at = file.attempted_at.or(file.fetched_at)?;
        let data = match (file.data, file.fetched_at) {
            (Some(limits), Some(fetched_at)) => Some(UsageData {
                session: limits.session,
                weekly: limits.weekly,
                sonnet: limits.sonnet,
                fetched_at,
            }),
            _ => None,
        };
        Some(CachedUsage { data, attempted_at })
    }

    /// Write atomically: a sibling temp file is renamed over the target, so
    /// concurrent readers never see a partial file. Without data only the
    /// attempt is recorded.
    pub fn save(&self, data: Option<&UsageData>, attempted_at: DateTime<Utc>) -> io::Result<()> {
        let dir = self.path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent")
        })?;
        std::fs::create_dir_all(dir)?;

        let file = CacheFile {
            data: data.map(|data| CachedLimits {
                session: data.session.clone(),
                weekly: data.weekly.clone(),
                sonnet: data.sonnet.clone(),
            }),
            fetched_at: data.map(|data| data.fetched_at),
            attempted_at: Some(attempted_at),
        };
        let json = serde_json::to_string(&file).map_err(io::Error::other)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Whether a refresh was attempted too recently to try again.
    pub fn is_rate_limited(&self, cached: &CachedUsage, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(cached.attempted_at) < self.rate_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(fetched_at: DateTime<Utc>) -> UsageData {
        UsageData {
            session: Some(UsageLimit {
                utilization: 42.0,
                resets_at: Some(Utc.with_ymd_and_hms(2025, 1, 16, 17, 0, 0).unwrap()),
            }),
            weekly: Some(UsageLimit {
                utilization: 7.5,
                resets_at: None,
            }),
            sonnet: None,
            fetched_at,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UsageCache::new(dir.path(), 30);
        let now = Utc.with_ymd_and_hms(2025, 1, 16, 12, 0, 0).unwrap();

        cache.save(Some(&sample(now)), now).unwrap();
        let loaded = cache.load().unwrap();
        assert_eq!(loaded.data, Some(sample(now)));
        assert_eq!(loaded.attempted_at, now);
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UsageCache::new(&dir.path().join("nested").join("statuskit"), 30);
        let now = Utc::now();
        cache.save(Some(&sample(now)), now).unwrap();
        assert!(cache.path().exists());
        // No temp files left behind
        let entries = std::fs::read_dir(cache.path().parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_missing_and_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UsageCache::new(dir.path(), 30);
        assert!(cache.load().is_none());

        std::fs::write(cache.path(), "{not json").unwrap();
        assert!(cache.load().is_none());

        std::fs::write(cache.path(), r#"{"data": {}}"#).unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_legacy_file_without_attempted_at() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UsageCache::new(dir.path(), 30);
        std::fs::write(
            cache.path(),
            r#"{"data": {"session": {"utilization": 10.0, "resets_at": null}, "weekly": null, "sonnet": null},
                "fetched_at": "2025-01-16T12:00:00+00:00"}"#,
        )
        .unwrap();
        let loaded = cache.load().unwrap();
        let data = loaded.data.unwrap();
        assert_eq!(loaded.attempted_at, data.fetched_at);
        assert_eq!(data.session.unwrap().utilization, 10.0);
    }

    #[test]
    fn test_rate_limit_window() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UsageCache::new(dir.path(), 30);
        let now = Utc.with_ymd_and_hms(2025, 1, 16, 12, 0, 0).unwrap();
        let cached = CachedUsage {
            data: Some(sample(now)),
            attempted_at: now,
        };
        assert!(cache.is_rate_limited(&cached, now + Duration::seconds(29)));
        assert!(!cache.is_rate_limited(&cached, now + Duration::seconds(30)));
    }

    #[test]
    fn test_attempt_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UsageCache::new(dir.path(), 30);
        let now = Utc.with_ymd_and_hms(2025, 1, 16, 12, 0, 0).unwrap();

        cache.save(None, now).unwrap();
        let loaded = cache.load().unwrap();
        assert_eq!(loaded.data, None);
        assert_eq!(loaded.attempted_at, now);
        assert!(cache.is_rate_limited(&loaded, now + Duration::seconds(5)));
    }
}
