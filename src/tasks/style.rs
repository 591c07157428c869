// src/tasks/style.rs

use std::path::Path;

use anyhow::{Context, anyhow};
use grass::{InputSyntax, Options, OutputStyle};
use tracing::info;

use crate::config::StyleOutput;
use crate::errors::Result;
use crate::tasks::TaskContext;
use crate::tasks::transform::{FileOutput, transform_each};
use crate::types::TaskKind;

/// Compile stylesheets from `src` into `.css` files under `temp`.
pub fn run(ctx: &TaskContext) -> Result<()> {
    let output = ctx.config.tools.style_output;
    let tool = ctx.config.tools.style.as_deref();

    let written = transform_each(
        ctx,
        TaskKind::Style,
        &ctx.src_dir(),
        &ctx.config.build.paths.styles,
        &ctx.temp_dir(),
        |src, input| {
            if is_partial(&src.rel) {
                return Ok(None);
            }
            let css = match tool {
                Some(cmd) => ctx.pipe_through(cmd, &input, &src.abs)?,
                None => compile(&input, &src.abs, output)?.into_bytes(),
            };
            Ok(Some(FileOutput {
                rel: src.rel.with_extension("css"),
                bytes: css,
            }))
        },
    )?;

    info!(files = written.len(), "compiled styles");
    Ok(())
}

/// Sass partials (`_name.scss`) are only ever imported.
pub fn is_partial(rel: &Path) -> bool {
    rel.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile one stylesheet. Imports resolve relative to the file's directory.
pub fn compile(source: &[u8], path: &Path, output: StyleOutput) -> anyhow::Result<String> {
    let source = std::str::from_utf8(source).context("stylesheet is not valid UTF-8")?;

    let syntax = match path.extension().and_then(|e| e.to_str()) {
        Some("sass") => InputSyntax::Sass,
        Some("css") => InputSyntax::Css,
        _ => InputSyntax::Scss,
    };
    let style = match output {
        StyleOutput::Expanded => OutputStyle::Expanded,
        StyleOutput::Compressed => OutputStyle::Compressed,
    };

    let mut options = Options::default().style(style).input_syntax(syntax);
    if let Some(dir) = path.parent() {
        options = options.load_path(dir);
    }

    grass::from_string(source.to_owned(), &options).map_err(|e| anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partials_are_recognised_by_file_name() {
        assert!(is_partial(Path::new("assets/styles/_vars.scss")));
        assert!(!is_partial(Path::new("assets/_dir/main.scss")));
    }

    #[test]
    fn nested_rules_are_flattened() {
        let css = compile(
            b"$c: #333; .nav { a { color: $c; } }",
            Path::new("main.scss"),
            StyleOutput::Expanded,
        )
        .unwrap();
        assert!(css.contains(".nav a"), "{css}");
        assert!(css.contains("color: #333"), "{css}");
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = compile(b".a { color: ", Path::new("bad.scss"), StyleOutput::Expanded)
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
