//! Per-source incremental cache (§4.C), plus the string/date-time/JSON-array entry kinds
//! from the original's `src/common/cache.py` (SPEC_FULL supplement 1). Every write goes
//! through [`atomic_write`], a temp-file-then-rename so a crash mid-write never corrupts a
//! watermark (§4.C, P2).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// A directory-backed cache of incremental-sync state, keyed by entry name. Absent entries
/// return `Ok(None)`, never a sentinel value (§4.C): callers fall back to a full fetch.
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Cache {
            cache_dir: cache_dir.into(),
        }
    }

    fn path_for(&self, entry_name: &str, extension: &str) -> PathBuf {
        self.cache_dir.join(format!("{entry_name}.{extension}"))
    }

    pub fn set_string(&self, entry_name: &str, value: &str) -> Result<()> {
        atomic_write(&self.path_for(entry_name, "txt"), value.as_bytes())
    }

    pub fn get_string(&self, entry_name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(entry_name, "txt")) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn set_date_time(&self, entry_name: &str, value: DateTime<Utc>) -> Result<()> {
        self.set_string(entry_name, &value.to_rfc3339())
    }

    pub fn get_date_time(&self, entry_name: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.get_string(entry_name)? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(dt) => Ok(Some(dt.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(entry = entry_name, error = %e, "corrupted date-time cache entry, treating as absent");
                Ok(None)
            }
        }
    }

    /// Cursor watermarks are stored as plain integers (§6.2).
    pub fn set_cursor(&self, entry_name: &str, value: i64) -> Result<()> {
        self.set_string(entry_name, &value.to_string())
    }

    pub fn get_cursor(&self, entry_name: &str) -> Result<Option<i64>> {
        let Some(raw) = self.get_string(entry_name)? else {
            return Ok(None);
        };
        match raw.trim().parse::<i64>() {
            Ok(cursor) => Ok(Some(cursor)),
            Err(e) => {
                tracing::warn!(entry = entry_name, error = %e, "corrupted cursor cache entry, treating as absent");
                Ok(None)
            }
        }
    }

    /// Newline-delimited JSON array entry (original's `set_messages`/`get_messages`,
    /// `set_rapid_pro_contacts`/`get_rapid_pro_contacts`): used to snapshot contact/identity
    /// lookups between runs.
    pub fn set_json_lines<T: Serialize>(&self, entry_name: &str, items: &[T]) -> Result<()> {
        let mut buf = String::new();
        for item in items {
            buf.push_str(&serde_json::to_string(item)?);
            buf.push('\n');
        }
        atomic_write(&self.path_for(entry_name, "jsonl"), buf.as_bytes())
    }

    pub fn get_json_lines<T: DeserializeOwned>(&self, entry_name: &str) -> Result<Option<Vec<T>>> {
        let contents = match fs::read_to_string(self.path_for(entry_name, "jsonl")) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        let mut items = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            items.push(serde_json::from_str(line)?);
        }
        Ok(Some(items))
    }

    pub fn clear(&self, entry_name: &str, extension: &str) -> Result<()> {
        let path = self.path_for(entry_name, extension);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Writes `contents` to `path` via a sibling temp file followed by an atomic rename, so a
/// crash mid-write leaves either the old or the new contents, never a partial file.
fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    use std::io::Write;
    tmp.write_all(contents)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn absent_entry_returns_none_not_sentinel() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        assert_eq!(cache.get_string("watermark").unwrap(), None);
        assert_eq!(cache.get_date_time("watermark").unwrap(), None);
        assert_eq!(cache.get_cursor("watermark").unwrap(), None);
    }

    #[test]
    fn round_trips_string() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.set_string("source-1", "hello").unwrap();
        assert_eq!(cache.get_string("source-1").unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn round_trips_date_time() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        cache.set_date_time("source-1", ts).unwrap();
        assert_eq!(cache.get_date_time("source-1").unwrap(), Some(ts));
    }

    #[test]
    fn round_trips_cursor() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.set_cursor("group-1", 42).unwrap();
        assert_eq!(cache.get_cursor("group-1").unwrap(), Some(42));
    }

    #[test]
    fn round_trips_json_lines() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let items = vec!["a".to_string(), "b".to_string()];
        cache.set_json_lines("contacts", &items).unwrap();
        let roundtripped: Vec<String> = cache.get_json_lines("contacts").unwrap().unwrap();
        assert_eq!(roundtripped, items);
    }

    #[test]
    fn overwrite_replaces_previous_value_atomically() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.set_string("source-1", "first").unwrap();
        cache.set_string("source-1", "second").unwrap();
        assert_eq!(cache.get_string("source-1").unwrap(), Some("second".to_string()));
    }

    #[test]
    fn clear_removes_entry() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        cache.set_string("source-1", "value").unwrap();
        cache.clear("source-1", "txt").unwrap();
        assert_eq!(cache.get_string("source-1").unwrap(), None);
    }
}
