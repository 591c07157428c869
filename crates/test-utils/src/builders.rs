use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagewright::config::BuildConfig;
use pagewright::config::loader::defaults;
use pagewright::fs::RealFileSystem;
use pagewright::tasks::TaskContext;
use tempfile::TempDir;

/// A project directory on disk laid out like the default configuration
/// (`src/assets/styles/*.scss`, `src/*.html`, `public/**`, ...).
pub struct ProjectBuilder {
    dir: TempDir,
    config: BuildConfig,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
            config: defaults().expect("built-in config is valid"),
        }
    }

    /// Write `contents` at `rel` under the project root.
    pub fn file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create parent dirs");
        fs::write(&path, contents).expect("write fixture file");
        self
    }

    pub fn style(self, name: &str, contents: &str) -> Self {
        self.file(&format!("src/assets/styles/{name}"), contents)
    }

    pub fn script(self, name: &str, contents: &str) -> Self {
        self.file(&format!("src/assets/scripts/{name}"), contents)
    }

    pub fn page(self, name: &str, contents: &str) -> Self {
        self.file(&format!("src/{name}"), contents)
    }

    /// Change the configuration before the project is built.
    pub fn configure(mut self, f: impl FnOnce(&mut BuildConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> Project {
        Project {
            dir: self.dir,
            config: Arc::new(self.config),
        }
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixture project. The directory is removed on drop.
pub struct Project {
    dir: TempDir,
    pub config: Arc<BuildConfig>,
}

impl Project {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    /// A build context over the real file system.
    pub fn context(&self) -> TaskContext {
        TaskContext::new(Arc::clone(&self.config), self.root(), Arc::new(RealFileSystem))
    }

    /// Every file under `rel`, relative to it, with forward slashes, sorted.
    pub fn files_under(&self, rel: &str) -> Vec<String> {
        let base = self.path(rel);
        let mut out = Vec::new();
        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(r) = path.strip_prefix(&base) {
                    out.push(r.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }
}
