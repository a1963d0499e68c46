//! File-based cache storage
//!
//! Each entry is a gzip-compressed JSON document named by its cache key.
//! Entry age comes from the file's modification time at read time.

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::key::CACHE_EXTENSION;
use crate::config::ENV_CACHE_PATH;
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

const SECS_PER_HOUR: f64 = 3600.0;

/// Where the cache directory comes from
#[derive(Debug, Clone)]
enum DirSource {
    /// Resolved on every call: MOBDB_CACHE_PATH > configured option > platform default
    Resolved { option: Option<PathBuf> },
    /// A fixed directory, ignoring the environment
    Fixed(PathBuf),
}

/// Filesystem-backed cache storage
#[derive(Debug, Clone)]
pub struct CacheStorage {
    source: DirSource,
}

/// Metadata for one cache entry, as reported by [`CacheStorage::list_entries`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    /// File name, which is also the cache key
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub age_hours: f64,
}

/// Statistics about cache clear operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearStats {
    pub entries_removed: usize,
}

impl CacheStorage {
    /// Storage whose directory is resolved from the environment on every call.
    ///
    /// `option` is the process-level setting (from [`crate::Config`]), consulted
    /// only when MOBDB_CACHE_PATH is unset.
    pub fn new(option: Option<PathBuf>) -> Self {
        Self {
            source: DirSource::Resolved { option },
        }
    }

    /// Storage pinned to a specific directory (for testing)
    pub fn open_at(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: DirSource::Fixed(dir.into()),
        }
    }

    /// Resolve the cache directory. Nothing is created and nothing is memoized.
    pub fn resolve_cache_dir(&self) -> Result<PathBuf> {
        match &self.source {
            DirSource::Fixed(dir) => Ok(dir.clone()),
            DirSource::Resolved { option } => {
                let env_value = std::env::var(ENV_CACHE_PATH).ok();
                resolve_dir(env_value.as_deref(), option.as_deref())
            }
        }
    }

    /// Create the cache directory (and parents) if it is missing.
    pub fn ensure_dir(&self) -> Result<PathBuf> {
        let dir = self.resolve_cache_dir()?;
        fs::create_dir_all(&dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;
        Ok(dir)
    }

    /// Full path of the entry for `key`
    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.resolve_cache_dir()?.join(key))
    }

    /// Read a cached payload.
    ///
    /// Returns `None` when the entry is missing, older than `max_age_hours`,
    /// or unreadable. Stale entries are left on disk.
    pub fn read<T: DeserializeOwned>(&self, key: &str, max_age_hours: Option<f64>) -> Option<T> {
        match self.try_read(key, max_age_hours) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn try_read<T: DeserializeOwned>(&self, key: &str, max_age_hours: Option<f64>) -> Result<Option<T>> {
        let path = self.entry_path(key)?;

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(e.to_string())),
        };

        if let Some(max_age) = max_age_hours {
            let age = age_hours(metadata.modified().ok());
            if age > max_age {
                log::debug!("Cache entry {} expired ({:.2}h > {:.2}h)", key, age, max_age);
                return Ok(None);
            }
        }

        let file = File::open(&path).map_err(|e| CacheError::Io(e.to_string()))?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let payload =
            serde_json::from_reader(decoder).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        Ok(Some(payload))
    }

    /// Serialize `payload` under `key`, replacing any existing entry.
    ///
    /// The entry is written to a temp file and renamed into place.
    pub fn write<T: Serialize + ?Sized>(&self, payload: &T, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        let dir = self.ensure_dir()?;
        let path = dir.join(key);
        let temp_path = dir.join(format!(".{}.tmp.{}", key, std::process::id()));

        if let Err(e) = write_compressed(&temp_path, payload) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CacheError::Io(format!("Failed to move cache entry into place: {}", e))
        })?;

        Ok(path)
    }

    /// Delete a single entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io(e.to_string())),
        }
    }

    /// All entries, most recently modified first.
    ///
    /// A missing or empty directory yields an empty list.
    pub fn list_entries(&self) -> Result<Vec<CacheEntryInfo>> {
        let dir = self.resolve_cache_dir()?;

        let read_dir = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::Io(format!("Failed to read cache dir: {}", e))),
        };

        let suffix = format!(".{}", CACHE_EXTENSION);
        let mut entries = Vec::new();

        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| CacheError::Io(e.to_string()))?;
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !name.ends_with(&suffix) {
                continue;
            }

            let metadata = match dir_entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Skipping cache entry {}: {}", name, e);
                    continue;
                }
            };

            let modified = metadata.modified().ok();
            entries.push(CacheEntryInfo {
                name,
                size: metadata.len(),
                modified: modified.map(DateTime::<Utc>::from).unwrap_or_else(Utc::now),
                age_hours: age_hours(modified),
            });
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Delete every entry, or only those older than `older_than_days`.
    pub fn clear(&self, older_than_days: Option<f64>) -> Result<ClearStats> {
        let dir = self.resolve_cache_dir()?;
        let mut removed = 0;

        for entry in self.list_entries()? {
            if let Some(days) = older_than_days
                && entry.age_hours / 24.0 <= days
            {
                continue;
            }

            match fs::remove_file(dir.join(&entry.name)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CacheError::Io(format!(
                        "Failed to remove {}: {}",
                        entry.name, e
                    )));
                }
            }
        }

        if removed > 0 {
            log::info!("Removed {} cache entries from {}", removed, dir.display());
        } else {
            log::info!("No cache entries to remove in {}", dir.display());
        }

        Ok(ClearStats {
            entries_removed: removed,
        })
    }
}

impl Default for CacheStorage {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Resolve the cache directory from an environment value and a configured option.
fn resolve_dir(env_value: Option<&str>, option: Option<&Path>) -> Result<PathBuf> {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Ok(expand_tilde(Path::new(value.trim())));
    }

    if let Some(option) = option {
        return Ok(expand_tilde(option));
    }

    let cache_base = dirs::cache_dir().ok_or(CacheError::NoCacheDir)?;
    Ok(cache_base.join("mobdb"))
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn validate_key(key: &str) -> Result<()> {
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !key.starts_with('.') => Ok(()),
        _ => Err(CacheError::Io(format!("Invalid cache key: {:?}", key))),
    }
}

fn write_compressed<T: Serialize + ?Sized>(path: &Path, payload: &T) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| CacheError::Io(format!("Failed to create cache entry: {}", e)))?;

    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, payload)
        .map_err(|e| CacheError::Io(format!("Failed to serialize cache entry: {}", e)))?;

    let mut writer = encoder
        .finish()
        .map_err(|e| CacheError::Io(format!("Failed to compress cache entry: {}", e)))?;
    writer
        .flush()
        .map_err(|e| CacheError::Io(format!("Failed to write cache entry: {}", e)))?;

    Ok(())
}

/// Age in hours relative to now; unknown or future times count as zero.
fn age_hours(modified: Option<SystemTime>) -> f64 {
    modified
        .and_then(|m| SystemTime::now().duration_since(m).ok())
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
        / SECS_PER_HOUR
}
