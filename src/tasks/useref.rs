// src/tasks/useref.rs

//! Build-block bundling of compiled pages.
//!
//! A page in `temp` may wrap script and stylesheet references in build
//! comments:
//!
//! ```html
//! <!-- build:js assets/scripts/vendor.js -->
//! <script src="/node_modules/jquery/dist/jquery.js"></script>
//! <!-- endbuild -->
//! ```
//!
//! Each block is replaced by one tag pointing at the bundle, the referenced
//! files are concatenated into that bundle, and every output is minified by
//! extension on its way to `dist`.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, anyhow, bail};
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::errors::{PagesError, Result};
use crate::fs::FileSystem;
use crate::tasks::TaskContext;
use crate::tasks::minify::minify_by_ext;
use crate::tasks::sources::{self, SourceFile};
use crate::types::TaskKind;

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s*build:(\w+)(?:\(([^)]*)\))?(?:\s+([^\s-][^\s]*))?\s*-->(.*?)<!--\s*endbuild\s*-->",
    )
    .expect("valid regex")
});

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Js,
    Css,
    Remove,
}

impl BlockKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "js" => Some(Self::Js),
            "css" => Some(Self::Css),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Self::Js => ";\n",
            _ => "\n",
        }
    }
}

/// One `<!-- build:... -->` block found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBlock {
    pub kind: BlockKind,
    /// Directory searched before the defaults, e.g. `.tmp` in `build:css(.tmp)`.
    pub alternate: Option<String>,
    /// Bundle URL as written in the block. `None` only for `remove`.
    pub target: Option<String>,
    /// `src`/`href` values inside the block, in document order.
    pub refs: Vec<String>,
}

/// A page with its blocks replaced, plus the blocks themselves.
#[derive(Debug)]
pub struct Rewritten {
    pub html: String,
    pub blocks: Vec<BuildBlock>,
}

/// Parse and replace every build block of `html`.
pub fn rewrite(html: &str) -> anyhow::Result<Rewritten> {
    let mut blocks = Vec::new();
    let mut failure = None;

    let replaced = BLOCK_RE.replace_all(html, |caps: &Captures<'_>| {
        match parse_block(caps) {
            Ok(block) => {
                let tag = replacement(&block);
                blocks.push(block);
                tag
            }
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }
    Ok(Rewritten {
        html: replaced.into_owned(),
        blocks,
    })
}

fn parse_block(caps: &Captures<'_>) -> anyhow::Result<BuildBlock> {
    let kind_str = &caps[1];
    let kind = BlockKind::parse(kind_str).ok_or_else(|| anyhow!("unknown build block type {kind_str:?}"))?;
    let alternate = caps.get(2).map(|m| m.as_str().trim().to_owned()).filter(|s| !s.is_empty());
    let target = caps.get(3).map(|m| m.as_str().to_owned());
    let body = caps.get(4).map_or("", |m| m.as_str());

    if kind != BlockKind::Remove && target.is_none() {
        bail!("build:{kind_str} block has no target path");
    }

    let re = match kind {
        BlockKind::Css => &*LINK_RE,
        _ => &*SCRIPT_RE,
    };
    let refs = re.captures_iter(body).map(|c| c[1].to_owned()).collect();

    Ok(BuildBlock {
        kind,
        alternate,
        target,
        refs,
    })
}

fn replacement(block: &BuildBlock) -> String {
    match (block.kind, block.target.as_deref()) {
        (BlockKind::Js, Some(t)) => format!(r#"<script src="{t}"></script>"#),
        (BlockKind::Css, Some(t)) => format!(r#"<link rel="stylesheet" href="{t}">"#),
        _ => String::new(),
    }
}

/// Strip query and fragment and percent-decode a reference URL.
fn url_path(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    percent_decode_str(&url[..end]).decode_utf8_lossy().into_owned()
}

/// Join a URL path onto `base`, refusing anything that climbs out of it.
fn join_url(base: &Path, url: &str) -> Option<PathBuf> {
    let mut out = base.to_path_buf();
    for part in Path::new(url.trim_start_matches('/')).components() {
        match part {
            Component::Normal(p) => out.push(p),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Find the file a reference points at.
///
/// Absolute URLs (`/node_modules/...`) are looked up in each search path.
/// Relative URLs are tried next to the page first.
fn locate(
    fs: &dyn FileSystem,
    url: &str,
    page_dir: &Path,
    search: &[PathBuf],
) -> anyhow::Result<PathBuf> {
    let path = url_path(url);
    let mut tried = Vec::new();

    for base in search {
        let candidate = if path.starts_with('/') {
            join_url(base, &path)
        } else {
            join_url(&base.join(page_dir), &path)
                .filter(|p| fs.is_file(p))
                .or_else(|| join_url(base, &path))
        };
        if let Some(candidate) = candidate {
            if fs.is_file(&candidate) {
                return Ok(candidate);
            }
            tried.push(candidate);
        }
    }

    bail!("referenced file {url:?} not found (tried {tried:?})")
}

fn search_paths(ctx: &TaskContext, alternate: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(alt) = alternate {
        paths.push(ctx.root.join(alt));
    }
    paths.push(ctx.temp_dir());
    paths.push(ctx.root.clone());
    paths
}

/// Bundle output path relative to `dist`.
fn bundle_rel(page_dir: &Path, target: &str) -> anyhow::Result<PathBuf> {
    let path = url_path(target);
    let base = if path.starts_with('/') { Path::new("") } else { page_dir };
    join_url(base, &path).ok_or_else(|| anyhow!("bundle target {target:?} leaves the output directory"))
}

fn concat(fs: &dyn FileSystem, files: &[PathBuf], separator: &str) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(separator.as_bytes());
        }
        let bytes = fs.read(file)?;
        out.extend_from_slice(bytes.strip_suffix(b"\n").unwrap_or(&bytes));
    }
    Ok(out)
}

/// Resolve build blocks in every compiled page and write pages and bundles
/// to `dist`.
///
/// A bundle target shared by several pages is written once, from the first
/// page (in path order) that declares it.
pub fn run(ctx: &TaskContext) -> Result<()> {
    let fs = ctx.fs.as_ref();
    let temp = ctx.temp_dir();
    let dist = ctx.dist_dir();
    let pages: Vec<SourceFile> = sources::collect(fs, &temp, &ctx.config.build.paths.pages)?;

    let mut bundles: BTreeMap<PathBuf, Vec<u8>> = BTreeMap::new();

    for page in &pages {
        let fail = |e: anyhow::Error| PagesError::transform(TaskKind::Useref.name(), &page.rel, format!("{e:#}"));
        let page_dir = page.rel.parent().unwrap_or(Path::new("")).to_path_buf();

        let html = fs.read_to_string(&page.abs)?;
        let rewritten = rewrite(&html).map_err(fail)?;

        for block in &rewritten.blocks {
            let Some(target) = block.target.as_deref().filter(|_| block.kind != BlockKind::Remove) else {
                continue;
            };
            let rel = bundle_rel(&page_dir, target).map_err(fail)?;
            if bundles.contains_key(&rel) {
                debug!(bundle = ?rel, page = %page.rel_str(), "bundle already built");
                continue;
            }

            let search = search_paths(ctx, block.alternate.as_deref());
            let files = block
                .refs
                .iter()
                .map(|url| locate(fs, url, &page_dir, &search))
                .collect::<anyhow::Result<Vec<_>>>()
                .map_err(fail)?;

            let joined = concat(fs, &files, block.kind.separator()).map_err(fail)?;
            let minified = minify_by_ext(&rel, joined)
                .with_context(|| format!("minifying bundle {target}"))
                .map_err(fail)?;
            debug!(bundle = ?rel, inputs = files.len(), bytes = minified.len(), "bundled");
            bundles.insert(rel, minified);
        }

        let out = minify_by_ext(&page.rel, rewritten.html.into_bytes()).map_err(fail)?;
        fs.write(&dist.join(&page.rel), &out)?;
    }

    for (rel, bytes) in &bundles {
        fs.write(&dist.join(rel), bytes)?;
    }

    info!(pages = pages.len(), bundles = bundles.len(), "bundled pages");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_block_becomes_one_script_tag() {
        let html = "<head>\n<!-- build:js assets/app.js -->\n<script src=\"a.js\"></script>\n<script src='/b.js?v=2'></script>\n<!-- endbuild -->\n</head>";
        let out = rewrite(html).unwrap();
        assert_eq!(out.html, "<head>\n<script src=\"assets/app.js\"></script>\n</head>");
        assert_eq!(out.blocks.len(), 1);
        assert_eq!(out.blocks[0].refs, vec!["a.js", "/b.js?v=2"]);
    }

    #[test]
    fn css_block_with_alternate_path() {
        let html = r#"<!-- build:css(.tmp) styles/site.css --><link rel="stylesheet" href="styles/main.css"><!-- endbuild -->"#;
        let out = rewrite(html).unwrap();
        assert_eq!(out.html, r#"<link rel="stylesheet" href="styles/site.css">"#);
        let block = &out.blocks[0];
        assert_eq!(block.kind, BlockKind::Css);
        assert_eq!(block.alternate.as_deref(), Some(".tmp"));
        assert_eq!(block.refs, vec!["styles/main.css"]);
    }

    #[test]
    fn remove_block_disappears() {
        let html = "<p>a</p><!-- build:remove --><script src=\"dev.js\"></script><!-- endbuild --><p>b</p>";
        let out = rewrite(html).unwrap();
        assert_eq!(out.html, "<p>a</p><p>b</p>");
        assert_eq!(out.blocks[0].kind, BlockKind::Remove);
    }

    #[test]
    fn unknown_block_type_is_an_error() {
        assert!(rewrite("<!-- build:wasm x.wasm --><!-- endbuild -->").is_err());
    }

    #[test]
    fn query_and_escapes_are_stripped() {
        assert_eq!(url_path("/a%20b.js?v=1#x"), "/a b.js");
    }

    #[test]
    fn parent_components_are_refused() {
        assert!(join_url(Path::new("/p"), "../etc/passwd").is_none());
        assert_eq!(join_url(Path::new("/p"), "/x/./y.js"), Some(PathBuf::from("/p/x/y.js")));
    }

    #[test]
    fn bundle_target_is_relative_to_page() {
        assert_eq!(
            bundle_rel(Path::new("blog"), "app.js").unwrap(),
            PathBuf::from("blog/app.js")
        );
        assert_eq!(
            bundle_rel(Path::new("blog"), "/app.js").unwrap(),
            PathBuf::from("app.js")
        );
    }
}
