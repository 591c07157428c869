// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{BuildConfig, load_config, resolve_config_path, validate_config};
use crate::dag::Scheduler;
use crate::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use crate::errors::{PagesError, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::Pipeline;
use crate::server::DevHooks;
use crate::tasks::TaskContext;

/// High-level entry point used by `main.rs`.
///
/// Loads the configuration from the working directory, then runs the
/// requested pipeline (`develop` when no subcommand is given).
pub async fn run(args: CliArgs) -> Result<()> {
    let root = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let config_path = resolve_config_path(&root, args.config.as_deref());
    let loaded = load_config(fs.as_ref(), &config_path)?;
    debug!(source = ?loaded.source, "configuration loaded");

    let command = args.command.unwrap_or_default();
    let mut config = loaded.config;
    if let Command::Develop { port: Some(port) } = command {
        config.server.port = port;
        validate_config(&config)?;
    }

    let pipeline = command.pipeline();
    if args.dry_run {
        return print_dry_run(command, &pipeline);
    }

    let config = Arc::new(config);
    match command {
        Command::Clean | Command::Build => {
            let ctx = Arc::new(TaskContext::new(config, root, fs));
            run_once(&pipeline, |tx| RealExecutorBackend::new(tx, ctx)).await?;
            Ok(())
        }
        Command::Develop { .. } => develop(&pipeline, config, root, fs).await,
    }
}

/// Run `pipeline` to completion once, every root seeded as a startup trigger.
///
/// Any failed task turns into [`PagesError::TaskFailed`]; the individual
/// errors have already been logged by the runtime.
pub async fn run_once<E, F>(pipeline: &Pipeline, make_executor: F) -> Result<RunReport>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let graph = pipeline.lower()?;
    let scheduler = Scheduler::from_pipeline(&graph);
    let roots = scheduler.root_tasks();
    info!(%pipeline, "running pipeline");

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = make_executor(tx.clone());

    for task in roots {
        tx.send(RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::Startup,
        })
        .await
        .map_err(anyhow::Error::from)?;
    }
    drop(tx);

    let core = CoreRuntime::new(
        scheduler,
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let reports = Runtime::new(core, rx, executor).run().await?;

    let mut merged = RunReport::default();
    for report in reports {
        merged.run_id = report.run_id;
        merged.succeeded.extend(report.succeeded);
        merged.failed.extend(report.failed);
        merged.errors.extend(report.errors);
    }

    if merged.is_success() {
        Ok(merged)
    } else {
        Err(PagesError::TaskFailed(merged.failed))
    }
}

/// Compile, serve, then rebuild on change until Ctrl-C.
///
/// Only a failure of the initial pipeline ends the session; failed rebuilds
/// are logged and the session keeps watching.
async fn develop(
    pipeline: &Pipeline,
    config: Arc<BuildConfig>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
) -> Result<()> {
    let (watch_tx, watch_rx) = mpsc::channel::<RuntimeEvent>(64);
    let dev = DevHooks::new(watch_tx.clone());
    let ctx = Arc::new(TaskContext::new(Arc::clone(&config), root, fs).with_dev(dev));

    run_once(pipeline, |tx| RealExecutorBackend::new(tx, Arc::clone(&ctx))).await?;
    info!("watching for changes; press Ctrl-C to stop");

    let rebuild = Pipeline::compile().lower()?;
    let core = CoreRuntime::new(
        Scheduler::from_pipeline(&rebuild),
        config.server.while_busy,
        1,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let executor = RealExecutorBackend::new(watch_tx.clone(), Arc::clone(&ctx));

    {
        let tx = watch_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let reports = Runtime::new(core, watch_rx, executor).run().await?;
    let failed = reports.iter().filter(|r| !r.is_success()).count();
    info!(rebuilds = reports.len(), failed, "develop session finished");
    Ok(())
}

/// Print the lowered task graph without running anything.
fn print_dry_run(command: Command, pipeline: &Pipeline) -> Result<()> {
    let graph = pipeline.lower()?;
    println!("pagewright dry-run: {}", command.name());
    println!("  pipeline = {pipeline}");
    println!();
    println!("tasks ({}):", graph.len());
    for kind in graph.topo_order()? {
        println!("  - {kind} -> {}", kind.output_dir());
        if let Some(node) = graph.get(kind)
            && !node.after.is_empty()
        {
            let after: Vec<&str> = node.after.iter().map(|k| k.name()).collect();
            println!("      after: {}", after.join(", "));
        }
    }
    Ok(())
}
