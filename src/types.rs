use std::fmt;

use serde::Deserialize;

/// Behaviour when a watch trigger arrives while the same task is still running.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: keep only the latest pending trigger of that task; queued
///   triggers of other tasks are kept. The running task itself is never
///   interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

/// Where a task writes its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDir {
    /// The intermediate directory (`build.temp`).
    Temp,
    /// The final output directory (`build.dist`).
    Dist,
    /// The task writes nothing (clean, server).
    None,
}

impl fmt::Display for OutputDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputDir::Temp => "temp",
            OutputDir::Dist => "dist",
            OutputDir::None => "-",
        })
    }
}

/// Every unit of work the orchestrator knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Clean,
    Style,
    Script,
    Page,
    Image,
    Font,
    Extra,
    Useref,
    Server,
}

impl TaskKind {
    pub const ALL: [TaskKind; 9] = [
        TaskKind::Clean,
        TaskKind::Style,
        TaskKind::Script,
        TaskKind::Page,
        TaskKind::Image,
        TaskKind::Font,
        TaskKind::Extra,
        TaskKind::Useref,
        TaskKind::Server,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Style => "style",
            TaskKind::Script => "script",
            TaskKind::Page => "page",
            TaskKind::Image => "image",
            TaskKind::Font => "font",
            TaskKind::Extra => "extra",
            TaskKind::Useref => "useref",
            TaskKind::Server => "server",
        }
    }

    pub fn output_dir(self) -> OutputDir {
        match self {
            TaskKind::Style | TaskKind::Script | TaskKind::Page => OutputDir::Temp,
            TaskKind::Image | TaskKind::Font | TaskKind::Extra | TaskKind::Useref => {
                OutputDir::Dist
            }
            TaskKind::Clean | TaskKind::Server => OutputDir::None,
        }
    }

    /// Whether written files are announced to live-reload clients.
    pub fn reloads_after_write(self) -> bool {
        matches!(self, TaskKind::Style | TaskKind::Script | TaskKind::Page)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
