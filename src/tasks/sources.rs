// src/tasks/sources.rs

//! Lazy enumeration of the files matching one glob under a base directory.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;

/// Compile a source glob. `*` does not cross directory separators, `**` does.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// One matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub abs: PathBuf,
    /// Path relative to the walk base; outputs keep this layout.
    pub rel: PathBuf,
}

impl SourceFile {
    /// `rel` with forward slashes, as matched against globs.
    pub fn rel_str(&self) -> String {
        rel_string(&self.rel)
    }
}

pub(crate) fn rel_string(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Depth-first walk yielding matches one at a time.
///
/// Directories are listed only when the walk reaches them; entries are sorted
/// so output order is stable. A missing base yields nothing.
pub struct SourceWalk<'a> {
    fs: &'a dyn FileSystem,
    base: PathBuf,
    matcher: GlobMatcher,
    dirs: Vec<PathBuf>,
    entries: VecDeque<PathBuf>,
}

impl<'a> SourceWalk<'a> {
    pub fn new(fs: &'a dyn FileSystem, base: &Path, pattern: &str) -> Result<Self> {
        let matcher = compile_glob(pattern)?;
        let dirs = if fs.is_dir(base) {
            vec![base.to_path_buf()]
        } else {
            Vec::new()
        };
        Ok(Self {
            fs,
            base: base.to_path_buf(),
            matcher,
            dirs,
            entries: VecDeque::new(),
        })
    }
}

impl Iterator for SourceWalk<'_> {
    type Item = Result<SourceFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(path) = self.entries.pop_front() {
                if self.fs.is_dir(&path) {
                    self.dirs.push(path);
                } else if self.fs.is_file(&path)
                    && let Ok(rel) = path.strip_prefix(&self.base)
                    && self.matcher.is_match(rel_string(rel))
                {
                    let rel = rel.to_path_buf();
                    return Some(Ok(SourceFile { abs: path, rel }));
                }
                continue;
            }

            let dir = self.dirs.pop()?;
            match self.fs.read_dir(&dir) {
                Ok(mut listed) => {
                    listed.sort();
                    self.entries.extend(listed);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Convenience: walk and collect, failing on the first listing error.
pub fn collect(fs: &dyn FileSystem, base: &Path, pattern: &str) -> Result<Vec<SourceFile>> {
    SourceWalk::new(fs, base, pattern)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn rels(files: &[SourceFile]) -> Vec<String> {
        files.iter().map(SourceFile::rel_str).collect()
    }

    fn fixture() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "<h1/>");
        fs.add_file("/p/src/about.html", "<h2/>");
        fs.add_file("/p/src/layouts/base.html", "{% block body %}{% endblock %}");
        fs.add_file("/p/src/assets/styles/main.scss", "a{}");
        fs.add_file("/p/src/assets/styles/_vars.scss", "$c: red;");
        fs.add_file("/p/src/assets/images/logo.png", vec![0u8; 4]);
        fs.add_file("/p/src/assets/images/icons/x.svg", "<svg/>");
        fs
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let fs = fixture();
        let files = collect(&fs, Path::new("/p/src"), "*.html").unwrap();
        assert_eq!(rels(&files), vec!["about.html", "index.html"]);
    }

    #[test]
    fn double_star_descends() {
        let fs = fixture();
        let files = collect(&fs, Path::new("/p/src"), "assets/images/**").unwrap();
        assert_eq!(
            rels(&files),
            vec!["assets/images/logo.png", "assets/images/icons/x.svg"]
        );
    }

    #[test]
    fn missing_base_is_empty() {
        let fs = fixture();
        assert!(collect(&fs, Path::new("/p/public"), "**").unwrap().is_empty());
    }

    #[test]
    fn absolute_path_is_preserved() {
        let fs = fixture();
        let files = collect(&fs, Path::new("/p/src"), "assets/styles/*.scss").unwrap();
        assert_eq!(files[0].abs, PathBuf::from("/p/src/assets/styles/_vars.scss"));
        assert_eq!(files.len(), 2);
    }
}
