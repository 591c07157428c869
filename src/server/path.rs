// src/server/path.rs

//! URL to file resolution over the layered static roots.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Where the dev server looks for files.
#[derive(Debug, Clone)]
pub struct StaticSite {
    /// URL prefix (`/node_modules`) and the directory it maps to. Checked
    /// before `roots`.
    pub routes: Vec<(String, PathBuf)>,
    /// Searched in order; the first root holding the file wins.
    pub roots: Vec<PathBuf>,
}

impl StaticSite {
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = normalize_url(url);

        for (prefix, dir) in &self.routes {
            let prefix = prefix.trim_matches('/');
            if let Some(rest) = path.strip_prefix(prefix)
                && (rest.is_empty() || rest.starts_with('/'))
            {
                return resolve_path(rest.trim_start_matches('/'), dir);
            }
        }

        self.roots.iter().find_map(|root| resolve_path(&path, root))
    }
}

/// Resolve a normalized URL path under `serve_root`, using `index.html` for
/// directories. Anything escaping the root (`..`, symlinks) is rejected.
pub fn resolve_path(clean: &str, serve_root: &Path) -> Option<PathBuf> {
    if Path::new(clean)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }

    let canonical = serve_root.join(clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Strip query and fragment, percent-decode and trim slashes.
fn normalize_url(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let decoded = percent_decode_str(&url[..end]).decode_utf8_lossy();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site(dir: &Path) -> StaticSite {
        for (path, body) in [
            ("temp/index.html", "compiled"),
            ("temp/assets/styles/main.css", "css"),
            ("src/index.html", "template"),
            ("src/assets/images/logo.png", "png"),
            ("public/robots.txt", "robots"),
            ("node_modules/jquery/dist/jquery.js", "jq"),
        ] {
            let full = dir.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, body).unwrap();
        }
        StaticSite {
            routes: vec![("/node_modules".into(), dir.join("node_modules"))],
            roots: vec![dir.join("temp"), dir.join("src"), dir.join("public")],
        }
    }

    fn body(path: Option<PathBuf>) -> String {
        fs::read_to_string(path.expect("resolved")).unwrap()
    }

    #[test]
    fn earlier_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        assert_eq!(body(site.resolve("/")), "compiled");
        assert_eq!(body(site.resolve("/index.html?x=1")), "compiled");
    }

    #[test]
    fn falls_through_to_src_and_public() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        assert_eq!(body(site.resolve("/assets/images/logo.png")), "png");
        assert_eq!(body(site.resolve("/robots.txt")), "robots");
    }

    #[test]
    fn routes_are_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        assert_eq!(body(site.resolve("/node_modules/jquery/dist/jquery.js")), "jq");
        assert!(site.resolve("/node_modulesx/jquery.js").is_none());
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        assert!(site.resolve("/../src/index.html").is_none());
        assert!(site.resolve("/%2e%2e/public/robots.txt").is_none());
        assert!(site.resolve("/missing.css").is_none());
    }

    #[test]
    fn dots_inside_a_file_name_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        fs::write(dir.path().join("public/app..min.js"), "min").unwrap();
        assert_eq!(body(site.resolve("/app..min.js")), "min");
    }
}
