use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::Response;

/// Hash of the query with surrounding and repeated whitespace removed, so
/// `"list  files"` and `" list files "` share an entry.
pub fn query_key(query: &str) -> String {
    let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Memoized responses, optionally mirrored to a JSON file.
///
/// Entries never expire. The file is rewritten in full after every insert; there is
/// no locking, two processes writing at once keep whichever wrote last.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, Response>,
    path: Option<PathBuf>,
}

impl ResponseCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`. An unreadable or corrupt file starts an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                log::warn!("Ignoring corrupt cache file {}: {err}", path.display());
                HashMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                log::warn!("Could not read cache file {}: {err}", path.display());
                HashMap::new()
            }
        };
        Self {
            entries,
            path: Some(path),
        }
    }

    /// Default location of the persistent store, if the platform has a cache dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("heydo").join("responses.json"))
    }

    pub fn get(&self, key: &str) -> Option<&Response> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, response: Response) {
        self.entries.insert(key, response);
        if let Some(path) = &self.path {
            if let Err(err) = Self::save(path, &self.entries) {
                log::warn!("Could not write cache file {}: {err}", path.display());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(path: &Path, entries: &HashMap<String, Response>) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(entries)?;
        fs::write(path, text)
    }
}
