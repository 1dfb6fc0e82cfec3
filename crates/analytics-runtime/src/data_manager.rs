//! Keyed cache of loaded datasets.
//!
//! A [`DatasetCache`] maps a source path to the [`LoadedDataset`] read from
//! it. Entries live until they are invalidated or the cache is cleared;
//! there is no time-to-live and no retry. A failed load leaves the cache
//! uncached and returns the error to the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use analytics_core::Result;
use analytics_data::reader::{load_user_records, LoadedDataset};

/// Path-keyed store of parsed datasets.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use analytics_runtime::data_manager::DatasetCache;
///
/// let mut cache = DatasetCache::new();
/// let dataset = cache.get_or_load(Path::new("data/players.csv"))?;
/// println!("{} players", dataset.records.len());
/// # Ok::<(), analytics_core::AnalyticsError>(())
/// ```
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<LoadedDataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the dataset for `path`, reading it on first use.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<LoadedDataset>> {
        if let Some(dataset) = self.entries.get(path) {
            tracing::debug!(path = %path.display(), "returning cached dataset");
            return Ok(Arc::clone(dataset));
        }

        let dataset = load_user_records(path).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "dataset load failed");
            e
        })?;
        let dataset = Arc::new(dataset);
        tracing::debug!(
            path = %path.display(),
            records = dataset.records.len(),
            "dataset cached"
        );
        self.entries.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop the entry for `path`. Returns `true` if one was present.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.entries.remove(path).is_some();
        tracing::debug!(path = %path.display(), removed, "cache entry invalidated");
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        tracing::debug!("cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "User_ID,Username,Game_Title,Device_Type,Preferred_Game_Mode,\
Subscription_Tier,Signup_Date,Last_Login,Total_Revenue_USD,Total_Play_Sessions";

    fn write_players(dir: &TempDir, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut body = format!("{HEADER}\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(&path, body).unwrap();
        path
    }

    fn one_player(dir: &TempDir, name: &str) -> PathBuf {
        write_players(
            dir,
            name,
            &["u1,alice,Star Quest,PC,Solo,Free,2024-01-05,2024-06-30,10,2"],
        )
    }

    // ── cache miss then hit ───────────────────────────────────────────────

    #[test]
    fn test_first_call_loads_and_caches() {
        let dir = TempDir::new().unwrap();
        let path = one_player(&dir, "players.csv");
        let mut cache = DatasetCache::new();

        assert!(cache.is_empty());
        let dataset = cache.get_or_load(&path).unwrap();
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&path));
    }

    #[test]
    fn test_second_call_returns_same_dataset() {
        let dir = TempDir::new().unwrap();
        let path = one_player(&dir, "players.csv");
        let mut cache = DatasetCache::new();

        let first = cache.get_or_load(&path).unwrap();
        // Changes on disk are not seen until the entry is invalidated.
        write_players(
            &dir,
            "players.csv",
            &[
                "u1,alice,Star Quest,PC,Solo,Free,2024-01-05,2024-06-30,10,2",
                "u2,bob,Racer X,Mobile,Solo,Free,2024-01-06,2024-06-30,5,1",
            ],
        );
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.records.len(), 1);
    }

    // ── invalidation ──────────────────────────────────────────────────────

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        let path = one_player(&dir, "players.csv");
        let mut cache = DatasetCache::new();
        cache.get_or_load(&path).unwrap();

        write_players(
            &dir,
            "players.csv",
            &[
                "u1,alice,Star Quest,PC,Solo,Free,2024-01-05,2024-06-30,10,2",
                "u2,bob,Racer X,Mobile,Solo,Free,2024-01-06,2024-06-30,5,1",
            ],
        );
        assert!(cache.invalidate(&path));
        assert!(!cache.invalidate(&path));
        assert!(cache.is_empty());

        let reloaded = cache.get_or_load(&path).unwrap();
        assert_eq!(reloaded.records.len(), 2);
    }

    #[test]
    fn test_clear_drops_every_entry() {
        let dir = TempDir::new().unwrap();
        let a = one_player(&dir, "a.csv");
        let b = one_player(&dir, "b.csv");
        let mut cache = DatasetCache::new();
        cache.get_or_load(&a).unwrap();
        cache.get_or_load(&b).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(&a));
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        let mut cache = DatasetCache::new();

        assert!(cache.get_or_load(&path).is_err());
        assert!(cache.is_empty());

        one_player(&dir, "missing.csv");
        assert!(cache.get_or_load(&path).is_ok());
        assert!(cache.contains(&path));
    }
}
