// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::watch::event_handler::{WatchContext, process_file_change};

/// Keeps the underlying `notify` watcher alive. Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the base directory of every profile recursively and feed changes to
/// `ctx` on `handle`.
///
/// Bases that do not exist (e.g. no `public` directory) are skipped.
pub fn spawn_watcher(ctx: Arc<WatchContext>, handle: &Handle) -> Result<WatcherHandle> {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away when the session is shutting down.
                let _ = event_tx.send(event);
            }
            Err(err) => warn!("file watch error: {err}"),
        },
        Config::default(),
    )?;

    let bases: BTreeSet<PathBuf> = ctx.profiles().iter().map(|p| p.base().to_path_buf()).collect();
    for base in &bases {
        if !base.is_dir() {
            debug!(?base, "not watching missing directory");
            continue;
        }
        watcher.watch(base, RecursiveMode::Recursive)?;
        info!("file watcher started on {:?}", base);
    }

    let seed_ctx = Arc::clone(&ctx);
    handle.spawn(async move {
        if tokio::task::spawn_blocking(move || seed_ctx.seed_hashes()).await.is_err() {
            warn!("seeding watch hashes panicked");
        }

        while let Some(event) = event_rx.recv().await {
            if event.kind.is_access() {
                continue;
            }
            debug!(?event, "received notify event");
            for path in &event.paths {
                if !process_file_change(&ctx, path).await {
                    debug!("runtime channel closed; watcher loop exiting");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
