// src/exec/command.rs

//! External tool commands configured under `[tools]`.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Build a shell command appropriate for the platform.
fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Pipe `input` through `cmd` (stdin -> stdout) in `cwd`.
///
/// The source path is exported as `PAGEWRIGHT_FILE` so tools that need a
/// file name (for error messages or import resolution) can use it. A non-zero
/// exit is an error carrying the tool's stderr.
pub fn pipe_through(cmd: &str, input: &[u8], cwd: &Path, file: &Path) -> Result<Vec<u8>> {
    debug!(cmd, ?file, "running external tool");

    let mut child = shell(cmd)
        .current_dir(cwd)
        .env("PAGEWRIGHT_FILE", file)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning tool `{cmd}`"))?;

    // Feed stdin from another thread so a tool that writes before reading all
    // input cannot deadlock on a full pipe.
    let mut stdin = child.stdin.take().context("tool stdin not captured")?;
    let input = input.to_vec();
    let writer = thread::spawn(move || stdin.write_all(&input));

    let output = child
        .wait_with_output()
        .with_context(|| format!("waiting for tool `{cmd}`"))?;

    match writer.join() {
        Ok(Ok(())) => {}
        // A tool may exit without draining stdin; its exit status decides.
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Ok(Err(e)) => return Err(e).with_context(|| format!("writing stdin of `{cmd}`")),
        Err(_) => bail!("stdin writer for `{cmd}` panicked"),
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "`{cmd}` exited with {}: {}",
            output.status.code().map_or("signal".to_string(), |c| c.to_string()),
            stderr.trim()
        );
    }

    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn output_of_tool_replaces_input() {
        let out = pipe_through("tr a-z A-Z", b"body { }", Path::new("."), Path::new("x.css")).unwrap();
        assert_eq!(out, b"BODY { }");
    }

    #[test]
    fn failing_tool_reports_stderr() {
        let err = pipe_through("echo boom >&2; exit 3", b"", Path::new("."), Path::new("x"))
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("exited with 3"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[test]
    fn file_name_is_exported() {
        let out = pipe_through("cat >/dev/null; printf %s \"$PAGEWRIGHT_FILE\"", b"x", Path::new("."), Path::new("a/b.js"))
            .unwrap();
        assert_eq!(out, b"a/b.js");
    }
}
