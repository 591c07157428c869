// src/tasks/script.rs

use std::path::Path;

use anyhow::{Context, anyhow, bail};
use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use tracing::info;

use crate::errors::Result;
use crate::tasks::TaskContext;
use crate::tasks::transform::{FileOutput, transform_each};
use crate::types::TaskKind;

/// Lower scripts from `src` to `tools.script_target` and write them to `temp`.
pub fn run(ctx: &TaskContext) -> Result<()> {
    let target = ctx.config.tools.script_target.as_str();
    let tool = ctx.config.tools.script.as_deref();

    let written = transform_each(
        ctx,
        TaskKind::Script,
        &ctx.src_dir(),
        &ctx.config.build.paths.scripts,
        &ctx.temp_dir(),
        |src, input| {
            let js = match tool {
                Some(cmd) => ctx.pipe_through(cmd, &input, &src.abs)?,
                None => {
                    let source = std::str::from_utf8(&input).context("script is not valid UTF-8")?;
                    transpile(source, &src.abs, target)?.into_bytes()
                }
            };
            Ok(Some(FileOutput::same_path(src, js)))
        },
    )?;

    info!(files = written.len(), "compiled scripts");
    Ok(())
}

/// Parse, lower to `target` (e.g. `"es2015"`) and print one script.
pub fn transpile(source: &str, path: &Path, target: &str) -> anyhow::Result<String> {
    let options = TransformOptions::from_target(target)
        .map_err(|e| anyhow!("invalid script target {target:?}: {e}"))?;

    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        bail!("{}", join_diagnostics(&parsed.errors));
    }
    let mut program = parsed.program;

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let transformed =
        Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        bail!("{}", join_diagnostics(&transformed.errors));
    }

    Ok(Codegen::new().build(&program).code)
}

fn join_diagnostics<D: std::fmt::Display>(errors: &[D]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
