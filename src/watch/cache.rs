// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Per-file hash cache, so an event only re-hashes the file that changed.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<String> {
        if let Some(hash) = self.hashes.get(path) {
            return Ok(hash.clone());
        }

        debug!("cache miss: computing hash for {:?}", path);
        let hash = compute_file_hash(fs, path)?;
        self.hashes.insert(path.to_path_buf(), hash.clone());
        Ok(hash)
    }

    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated cache for {:?}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn stale_until_invalidated() {
        let fs = MockFileSystem::new();
        let path = Path::new("/a.css");
        fs.add_file(path, "a{}");

        let mut cache = FileCache::new();
        let first = cache.get_or_compute(&fs, path).unwrap();

        fs.add_file(path, "b{}");
        assert_eq!(cache.get_or_compute(&fs, path).unwrap(), first);

        cache.invalidate(path);
        assert_ne!(cache.get_or_compute(&fs, path).unwrap(), first);
    }
}
