// src/tasks/minify.rs

//! Minification of bundled output: oxc for JavaScript, lightningcss for CSS
//! and minify-html for pages.

use std::path::Path;

use anyhow::{Result, anyhow, bail};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, CompressOptionsUnused, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Mangle and compress a classic script. Parse errors are returned, never
/// skipped.
///
/// Bundled files are loaded with `<script src>`, so their top-level
/// declarations are page globals that other scripts may call. Those names are
/// neither renamed nor dropped; only local scopes are mangled.
pub fn minify_js(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(first) = ret.errors.first() {
        bail!("{first}");
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions {
            unused: CompressOptionsUnused::Keep,
            ..CompressOptions::smallest()
        }),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

pub fn minify_css(source: &str) -> Result<String> {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| anyhow!("{e}"))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{e}"))?;
    Ok(result.code)
}

/// Collapse whitespace, drop comments and minify inline `<style>`/`<script>`.
pub fn minify_html(source: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    minify_html::minify(source, &cfg)
}

/// Minify by extension. Files of other types are returned unchanged.
pub fn minify_by_ext(path: &Path, content: Vec<u8>) -> Result<Vec<u8>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "js" => Ok(minify_js(as_text(&content)?)?.into_bytes()),
        "css" => Ok(minify_css(as_text(&content)?)?.into_bytes()),
        "html" | "htm" => Ok(minify_html(&content)),
        _ => Ok(content),
    }
}

fn as_text(content: &[u8]) -> Result<&str> {
    std::str::from_utf8(content).map_err(|e| anyhow!("not valid UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_gets_smaller() {
        let src = "function add(first, second) {\n    // sum\n    return first + second;\n}\nconsole.log(add(1, 2));\n";
        let out = minify_js(src).unwrap();
        assert!(out.len() < src.len(), "{out}");
    }

    #[test]
    fn top_level_names_survive() {
        let out = minify_js("function greet(name) {\n    return 'hi ' + name;\n}\n").unwrap();
        assert!(out.contains("function greet("), "{out}");

        let out = minify_js("var counter = 0;\ncounter += 1;\n").unwrap();
        assert!(out.contains("counter"), "{out}");
    }

    #[test]
    fn locals_are_still_mangled() {
        let src = "function total(values) {\n    var running_sum = 0;\n    for (var i = 0; i < values.length; i++) running_sum += values[i];\n    return running_sum;\n}\n";
        let out = minify_js(src).unwrap();
        assert!(out.contains("function total("), "{out}");
        assert!(!out.contains("running_sum"), "{out}");
    }

    #[test]
    fn css_gets_smaller() {
        let src = "body {\n    margin: 0px;\n    color: #ff0000;\n}\n";
        let out = minify_css(src).unwrap();
        assert!(out.len() < src.len(), "{out}");
    }

    #[test]
    fn broken_js_is_an_error() {
        assert!(minify_js("function (").is_err());
    }

    #[test]
    fn html_whitespace_and_comments_are_dropped() {
        let src = b"<html>\n  <body>\n    <!-- note -->\n    <p>  hi  </p>\n  </body>\n</html>\n";
        let out = minify_html(src);
        assert!(out.len() < src.len());
        assert!(!String::from_utf8_lossy(&out).contains("note"));
    }

    #[test]
    fn other_extensions_untouched() {
        let out = minify_by_ext(Path::new("a.txt"), b"  x  ".to_vec()).unwrap();
        assert_eq!(out, b"  x  ");
    }
}
