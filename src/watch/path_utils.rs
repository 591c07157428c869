// src/watch/path_utils.rs

use std::path::Path;

/// `path` relative to `root` with forward slashes.
///
/// Falls back to comparing canonical paths, since notify may report a
/// different absolute prefix for the same directory (symlinks, `/private/var`
/// on macOS). `None` when `path` is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let (root_canon, path_canon) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root() {
        assert_eq!(
            relative_str(Path::new("/p/src"), Path::new("/p/src/a/b.js")).as_deref(),
            Some("a/b.js")
        );
    }

    #[test]
    fn outside_root_is_none() {
        assert_eq!(relative_str(Path::new("/p/src"), Path::new("/nowhere/x.js")), None);
    }
}
