// src/server/reload.rs

//! Live-reload broadcasting over WebSocket.

use std::fmt;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::json;
use tracing::{debug, warn};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::tasks::sources::rel_string;

/// Broadcasts reload messages to every connected browser.
///
/// Cloning shares the client list. With no clients connected (e.g. during
/// `build`) a reload does nothing.
#[derive(Clone, Default)]
pub struct Reloader {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
}

impl fmt::Debug for Reloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reloader")
            .field("clients", &self.client_count())
            .finish()
    }
}

impl Reloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Accept WebSocket clients on `listener` from a background thread.
    pub fn listen(&self, listener: TcpListener) {
        let reloader = self.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        debug!(error = %e, "reload listener accept failed");
                        continue;
                    }
                };
                match tungstenite::accept(stream) {
                    Ok(ws) => {
                        if let Ok(mut clients) = reloader.clients.lock() {
                            clients.push(ws);
                            debug!(clients = clients.len(), "reload client connected");
                        }
                    }
                    Err(e) => debug!(error = %e, "websocket handshake failed"),
                }
            }
        });
    }

    /// Tell browsers that `paths` (relative to the served roots) changed.
    /// Clients whose connection is gone are dropped.
    pub fn reload(&self, paths: &[PathBuf]) {
        if paths.is_empty() {
            return;
        }
        let Ok(mut clients) = self.clients.lock() else {
            warn!("reload client list poisoned");
            return;
        };
        if clients.is_empty() {
            return;
        }

        let text = message_for(paths);
        clients.retain_mut(|ws| match ws.send(Message::Text(text.clone().into())) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "dropping reload client");
                false
            }
        });
        debug!(clients = clients.len(), paths = paths.len(), "reload broadcast");
    }
}

/// JSON payload of a reload broadcast.
pub fn message_for(paths: &[PathBuf]) -> String {
    let paths: Vec<String> = paths.iter().map(|p| rel_string(p)).collect();
    json!({ "type": "reload", "paths": paths }).to_string()
}

/// Browser side: swap stylesheets in place when only CSS changed, reload
/// the page otherwise.
fn client_script(reload_port: u16) -> String {
    format!(
        r#"<script>(function(){{var ws=new WebSocket("ws://"+location.hostname+":{reload_port}");ws.onmessage=function(e){{var m=JSON.parse(e.data);if(m.type!=="reload")return;var css=m.paths.length>0&&m.paths.every(function(p){{return /\.css$/.test(p)}});if(!css){{location.reload();return}}document.querySelectorAll('link[rel="stylesheet"]').forEach(function(l){{var u=new URL(l.href);u.searchParams.set("_reload",Date.now());l.href=u.toString()}})}}}})();</script>"#
    )
}

/// Insert the client script before the last `</body>`, or append it.
pub fn inject_hotreload(content: &[u8], reload_port: u16) -> Vec<u8> {
    let script = client_script(reload_port);
    let script = script.as_bytes();
    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + script.len());
    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script);
        }
    }
    result
}

/// Whether a served file gets the client script.
pub fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html" | "htm")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lists_paths_with_forward_slashes() {
        let msg = message_for(&[PathBuf::from("assets/styles/main.css")]);
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "reload");
        assert_eq!(value["paths"][0], "assets/styles/main.css");
    }

    #[test]
    fn reload_without_clients_is_a_no_op() {
        let reloader = Reloader::new();
        reloader.reload(&[PathBuf::from("index.html")]);
        assert_eq!(reloader.client_count(), 0);
    }

    #[test]
    fn script_goes_before_last_body_close() {
        let out = inject_hotreload(b"<html><BODY><p>x</p></BODY></html>", 35729);
        let out = String::from_utf8(out).unwrap();
        let script = out.find("<script>").unwrap();
        assert!(script < out.find("</BODY>").unwrap());
        assert!(out.contains(":35729"));
        assert!(out.ends_with("</BODY></html>"));
    }

    #[test]
    fn script_is_appended_without_body() {
        let out = inject_hotreload(b"<p>x</p>", 1);
        assert!(out.starts_with(b"<p>x</p><script>"));
    }
}
