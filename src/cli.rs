// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::pipeline::Pipeline;

/// Command-line arguments for `pagewright`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pagewright",
    version,
    about = "Compile, bundle and serve a static front-end project.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Working directory every configured path is relative to.
    ///
    /// Default: the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Override file merged over the built-in configuration.
    ///
    /// Default: `pages.config.toml` in the working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PAGEWRIGHT_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the task graph of the selected pipeline without running it.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Remove the dist and temp directories.
    Clean,
    /// Clean, compile, bundle and optimise everything into dist.
    Build,
    /// Compile into temp, serve and rebuild on change.
    #[command(alias = "serve")]
    Develop {
        /// HTTP port (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Develop { port: None }
    }
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Clean => "clean",
            Command::Build => "build",
            Command::Develop { .. } => "develop",
        }
    }

    pub fn pipeline(self) -> Pipeline {
        match self {
            Command::Clean => Pipeline::clean(),
            Command::Build => Pipeline::build(),
            Command::Develop { .. } => Pipeline::develop(),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_develop() {
        let args = CliArgs::try_parse_from(["pagewright"]).unwrap();
        assert_eq!(args.command.unwrap_or_default(), Command::Develop { port: None });
    }

    #[test]
    fn serve_is_an_alias_with_port() {
        let args = CliArgs::try_parse_from(["pagewright", "serve", "--port", "3000"]).unwrap();
        assert_eq!(args.command, Some(Command::Develop { port: Some(3000) }));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["pagewright", "build", "--cwd", "site", "--dry-run"]).unwrap();
        assert_eq!(args.command, Some(Command::Build));
        assert_eq!(args.cwd, Some(PathBuf::from("site")));
        assert!(args.dry_run);
    }
}
