// src/watch/hash.rs

//! Content hashing for watch profiles.
//!
//! Editors often touch a file without changing it (save-all, format-on-save).
//! A profile with hashing enabled only re-runs its task when the combined
//! hash of every file it watches differs from the last one seen.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash one file, streaming it through the file system seam.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Combine per-file hashes. `hashes` must be ordered by file path.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Last aggregate hash per watch profile, for the lifetime of a session.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, profile: &str) -> Option<&str> {
        self.map.get(profile).map(String::as_str)
    }

    pub fn save(&mut self, profile: &str, hash: &str) {
        self.map.insert(profile.to_string(), hash.to_string());
        debug!(profile = %profile, hash = %hash, "stored profile hash");
    }

    /// Store `hash` and report whether it differs from the previous one.
    /// The first hash seen for a profile counts as a change.
    pub fn replace(&mut self, profile: &str, hash: &str) -> bool {
        let changed = self.load(profile) != Some(hash);
        if changed {
            self.save(profile, hash);
        }
        changed
    }
}
