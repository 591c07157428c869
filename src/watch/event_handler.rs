// src/watch/event_handler.rs

//! Turns one changed path into task triggers and reload broadcasts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::server::Reloader;
use crate::watch::cache::FileCache;
use crate::watch::hash::{MemoryHashStore, compute_aggregate_hash};
use crate::watch::patterns::{WatchAction, WatchProfile, collect_matching_files};

#[derive(Debug, Default)]
struct HashState {
    store: MemoryHashStore,
    cache: FileCache,
}

/// Everything the watcher needs to react to a change.
#[derive(Debug)]
pub struct WatchContext {
    fs: Arc<dyn FileSystem>,
    profiles: Vec<WatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    reloader: Reloader,
    hashes: Mutex<HashState>,
}

impl WatchContext {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        profiles: Vec<WatchProfile>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        reloader: Reloader,
    ) -> Self {
        Self {
            fs,
            profiles,
            runtime_tx,
            reloader,
            hashes: Mutex::new(HashState::default()),
        }
    }

    pub fn profiles(&self) -> &[WatchProfile] {
        &self.profiles
    }

    /// Record the current content hash of every hashed profile, so the first
    /// no-op save after startup is already recognised as one.
    pub fn seed_hashes(&self) {
        for profile in self.profiles.iter().filter(|p| p.use_hash()) {
            if let Some(hash) = self.aggregate_hash(profile, None)
                && let Ok(mut state) = self.hashes.lock()
            {
                state.store.save(profile.name(), &hash);
            }
        }
    }

    /// Aggregate hash of a profile's files, re-hashing `changed` if given.
    /// `None` (trigger anyway) when a file cannot be read.
    fn aggregate_hash(&self, profile: &WatchProfile, changed: Option<&Path>) -> Option<String> {
        let fs = self.fs.as_ref();
        let files = match collect_matching_files(fs, profile) {
            Ok(files) => files,
            Err(err) => {
                warn!(profile = %profile.name(), error = %err, "failed to collect watched files");
                return None;
            }
        };

        let Ok(mut state) = self.hashes.lock() else {
            warn!("hash state mutex poisoned");
            return None;
        };
        if let Some(path) = changed {
            state.cache.invalidate(path);
        }

        let mut hashes = Vec::with_capacity(files.len());
        for file in &files {
            match state.cache.get_or_compute(fs, file) {
                Ok(h) => hashes.push(h),
                Err(err) => {
                    warn!(profile = %profile.name(), file = ?file, error = %err, "failed to hash file");
                    return None;
                }
            }
        }
        Some(compute_aggregate_hash(&hashes))
    }
}

/// React to a change of `path`: trigger every task whose profile matches
/// and broadcast a reload for files served straight from disk.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(ctx: &Arc<WatchContext>, path: &Path) -> bool {
    let mut reload_paths = Vec::new();

    for profile in &ctx.profiles {
        let Some(rel) = profile.match_path(path) else {
            continue;
        };

        match profile.action() {
            WatchAction::Reload => reload_paths.push(PathBuf::from(rel)),
            WatchAction::Run(kind) => {
                if !should_trigger(ctx, profile, path, &rel).await {
                    continue;
                }
                debug!(task = %kind, path = %rel, "watch match -> triggering task");
                let event = RuntimeEvent::TaskTriggered {
                    task: kind.name().to_string(),
                    reason: TriggerReason::FileWatch,
                };
                if let Err(err) = ctx.runtime_tx.send(event).await {
                    warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
                    return false;
                }
            }
        }
    }

    if !reload_paths.is_empty() {
        ctx.reloader.reload(&reload_paths);
    }
    true
}

async fn should_trigger(ctx: &Arc<WatchContext>, profile: &WatchProfile, path: &Path, rel: &str) -> bool {
    if !profile.use_hash() {
        return true;
    }

    let this = Arc::clone(ctx);
    let profile = profile.clone();
    let path = path.to_path_buf();
    let rel = rel.to_string();

    tokio::task::spawn_blocking(move || {
        let Some(hash) = this.aggregate_hash(&profile, Some(&path)) else {
            return true;
        };
        let Ok(mut state) = this.hashes.lock() else {
            warn!("hash state mutex poisoned; triggering anyway");
            return true;
        };
        let changed = state.store.replace(profile.name(), &hash);
        if !changed {
            info!(profile = %profile.name(), path = %rel, "content unchanged; skipping rebuild");
        }
        changed
    })
    .await
    .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::defaults;
    use crate::fs::mock::MockFileSystem;
    use crate::watch::patterns::build_profiles;

    fn context(fs: &MockFileSystem) -> (Arc<WatchContext>, mpsc::Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let profiles = build_profiles(&defaults().unwrap(), Path::new("/p")).unwrap();
        let ctx = WatchContext::new(Arc::new(fs.clone()), profiles, tx, Reloader::new());
        (Arc::new(ctx), rx)
    }

    fn triggered(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RuntimeEvent::TaskTriggered { task, .. } = event {
                out.push(task);
            }
        }
        out
    }

    #[tokio::test]
    async fn script_change_triggers_script_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/assets/scripts/main.js", "let a = 1;");
        let (ctx, mut rx) = context(&fs);

        assert!(process_file_change(&ctx, Path::new("/p/src/assets/scripts/main.js")).await);
        assert_eq!(triggered(&mut rx), vec!["script"]);
    }

    #[tokio::test]
    async fn unchanged_content_is_skipped() {
        let fs = MockFileSystem::new();
        let path = Path::new("/p/src/assets/styles/main.scss");
        fs.add_file(path, "a { color: red; }");
        let (ctx, mut rx) = context(&fs);
        ctx.seed_hashes();

        process_file_change(&ctx, path).await;
        assert!(triggered(&mut rx).is_empty());

        fs.add_file(path, "a { color: blue; }");
        process_file_change(&ctx, path).await;
        assert_eq!(triggered(&mut rx), vec!["style"]);
    }

    #[tokio::test]
    async fn image_change_triggers_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/assets/images/a.png", vec![1u8, 2, 3]);
        let (ctx, mut rx) = context(&fs);

        process_file_change(&ctx, Path::new("/p/src/assets/images/a.png")).await;
        assert!(triggered(&mut rx).is_empty());
    }
}
