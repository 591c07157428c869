// src/server/mod.rs

//! Development server: static files, live reload and file watching.
//!
//! The `server` task moves a develop session from idle to watching. It binds
//! the HTTP and WebSocket listeners, starts the watcher and returns; the
//! session then lives until the [`DevHooks`] holding it is dropped.

pub mod path;
pub mod reload;
pub mod response;

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;

use tiny_http::{Request, Server};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{PagesError, Result};
use crate::tasks::TaskContext;
use crate::watch::{self, WatchContext, WatcherHandle};

pub use path::StaticSite;
pub use reload::Reloader;

/// Ports tried after a busy one before giving up.
const MAX_PORT_RETRIES: u16 = 10;

/// Develop-only state carried by the task context.
pub struct DevHooks {
    /// Where watch triggers go: the rebuild runtime's event channel.
    pub watch_tx: mpsc::Sender<RuntimeEvent>,
    session: Mutex<Option<DevSession>>,
}

impl fmt::Debug for DevHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevHooks")
            .field("addr", &self.addr())
            .finish_non_exhaustive()
    }
}

impl DevHooks {
    pub fn new(watch_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            watch_tx,
            session: Mutex::new(None),
        }
    }

    /// HTTP address, once the server task has run.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.session.lock().ok()?.as_ref().map(|s| s.addr)
    }
}

/// A running session. Dropping it stops the watcher and the HTTP loop.
struct DevSession {
    addr: SocketAddr,
    server: Arc<Server>,
    _watcher: WatcherHandle,
}

impl Drop for DevSession {
    fn drop(&mut self) {
        self.server.unblock();
        debug!(addr = %self.addr, "dev server stopped");
    }
}

/// The `server` task.
pub fn start(ctx: &TaskContext) -> Result<()> {
    let dev = ctx
        .dev
        .as_ref()
        .ok_or_else(|| PagesError::Server("the server task only runs in a develop session".into()))?;

    let mut session = dev
        .session
        .lock()
        .map_err(|_| PagesError::Server("dev session lock poisoned".into()))?;
    if session.is_some() {
        debug!("dev server already running");
        return Ok(());
    }

    let server_cfg = &ctx.config.server;
    let (server, addr) = bind_with_retry(server_cfg.port, Server::http)?;
    let (listener, reload_addr) = bind_with_retry(server_cfg.reload_port, TcpListener::bind)?;
    ctx.reloader.listen(listener);

    let site = StaticSite {
        routes: server_cfg
            .routes
            .iter()
            .map(|(prefix, dir)| (prefix.clone(), ctx.root.join(dir)))
            .collect(),
        roots: vec![ctx.temp_dir(), ctx.src_dir(), ctx.public_dir()],
    };
    let server = Arc::new(server);
    spawn_request_loop(Arc::clone(&server), site, reload_addr.port());

    let profiles = watch::build_profiles(&ctx.config, &ctx.root)?;
    let watch_ctx = WatchContext::new(
        Arc::clone(&ctx.fs),
        profiles,
        dev.watch_tx.clone(),
        ctx.reloader.clone(),
    );
    let handle = Handle::try_current()
        .map_err(|e| PagesError::Server(format!("no async runtime for the watcher: {e}")))?;
    let watcher = watch::spawn_watcher(Arc::new(watch_ctx), &handle)?;

    info!("serving http://localhost:{} (live reload on {})", addr.port(), reload_addr.port());
    *session = Some(DevSession {
        addr,
        server,
        _watcher: watcher,
    });
    Ok(())
}

/// Bind `bind` to `base_port`, moving on to the next port while it is busy.
pub fn bind_with_retry<T, E, F>(base_port: u16, bind: F) -> Result<(T, SocketAddr)>
where
    F: Fn(SocketAddr) -> std::result::Result<T, E>,
    E: fmt::Display,
{
    let mut last_error = String::new();
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        match bind(addr) {
            Ok(bound) => {
                if offset > 0 {
                    info!("port {base_port} in use, using {port} instead");
                }
                return Ok((bound, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(PagesError::Server(format!(
        "failed to bind after {MAX_PORT_RETRIES} attempts (ports {base_port}-{}): {last_error}",
        base_port.saturating_add(MAX_PORT_RETRIES - 1)
    )))
}

fn spawn_request_loop(server: Arc<Server>, site: StaticSite, reload_port: u16) {
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_string();
            if let Err(e) = handle_request(request, &site, reload_port) {
                warn!(url = %url, error = %e, "request failed");
            }
        }
        debug!("request loop finished");
    });
}

fn handle_request(request: Request, site: &StaticSite, reload_port: u16) -> anyhow::Result<()> {
    match site.resolve(request.url()) {
        Some(path) => {
            debug!(url = %request.url(), ?path, "serve");
            response::respond_file(request, &path, reload_port)
        }
        None => response::respond_not_found(request),
    }
}
