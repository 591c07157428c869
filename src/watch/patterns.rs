// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::BuildConfig;
use crate::fs::FileSystem;
use crate::tasks::sources::rel_string;
use crate::types::TaskKind;
use crate::watch::path_utils::relative_str;

/// What a change to a watched file causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchAction {
    /// Re-run exactly this task.
    Run(TaskKind),
    /// The file is served as-is; just tell browsers to reload.
    Reload,
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAction::Run(kind) => write!(f, "run:{kind}"),
            WatchAction::Reload => f.write_str("reload"),
        }
    }
}

/// Compiled globs under one base directory bound to one action.
///
/// Patterns are relative to `base`, the same way the task globs are.
#[derive(Clone)]
pub struct WatchProfile {
    name: String,
    base: PathBuf,
    action: WatchAction,
    watch_set: GlobSet,
    use_hash: bool,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn new(
        name: impl Into<String>,
        base: impl Into<PathBuf>,
        patterns: &[&str],
        action: WatchAction,
        use_hash: bool,
    ) -> Result<Self> {
        let name = name.into();
        let watch_set = build_globset(patterns)
            .with_context(|| format!("building watch globset for {name}"))?;
        Ok(Self {
            name,
            base: base.into(),
            action,
            watch_set,
            use_hash,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn action(&self) -> WatchAction {
        self.action
    }

    /// Content hashing applies only to profiles that run a task.
    pub fn use_hash(&self) -> bool {
        self.use_hash && matches!(self.action, WatchAction::Run(_))
    }

    /// Path of `path` relative to this profile's base, if it is a match.
    pub fn match_path(&self, path: &Path) -> Option<String> {
        let rel = relative_str(&self.base, path)?;
        self.watch_set.is_match(&rel).then_some(rel)
    }
}

/// Profiles for a development session rooted at `root`.
///
/// Styles, scripts and pages each re-run their own task. Images and fonts
/// under `src` and everything under `public` are served straight from disk,
/// so they only trigger a reload.
pub fn build_profiles(cfg: &BuildConfig, root: &Path) -> Result<Vec<WatchProfile>> {
    let src = cfg.src_dir(root);
    let paths = &cfg.build.paths;
    let use_hash = cfg.server.use_hash;

    Ok(vec![
        WatchProfile::new("styles", &src, &[paths.styles.as_str()], WatchAction::Run(TaskKind::Style), use_hash)?,
        WatchProfile::new("scripts", &src, &[paths.scripts.as_str()], WatchAction::Run(TaskKind::Script), use_hash)?,
        WatchProfile::new("pages", &src, &[paths.pages.as_str()], WatchAction::Run(TaskKind::Page), use_hash)?,
        WatchProfile::new("assets", &src, &[paths.images.as_str(), paths.fonts.as_str()], WatchAction::Reload, false)?,
        WatchProfile::new("public", cfg.public_dir(root), &["**"], WatchAction::Reload, false)?,
    ])
}

/// Every action a change to `path` maps to, without duplicates.
pub fn actions_for_path(profiles: &[WatchProfile], path: &Path) -> Vec<WatchAction> {
    let mut actions: Vec<WatchAction> = profiles
        .iter()
        .filter(|p| p.match_path(path).is_some())
        .map(WatchProfile::action)
        .collect();
    actions.sort();
    actions.dedup();
    actions
}

/// Single `*` stays within one directory, matching the task globs.
fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// All files under the profile's base that it watches, sorted.
///
/// Used to compute the aggregate content hash of a profile.
pub fn collect_matching_files(fs: &dyn FileSystem, profile: &WatchProfile) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(profile.base()) {
        return Ok(files);
    }
    let mut stack = vec![profile.base().to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path)
                && let Ok(rel) = path.strip_prefix(profile.base())
                && profile.watch_set.is_match(rel_string(rel))
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
