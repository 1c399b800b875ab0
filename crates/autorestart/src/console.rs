// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Console collaborators for a wrapped server process
//!
//! Chat broadcasts and the quit command are written to the server's own
//! console (its stdin). Operator input is matched against registered
//! commands first and forwarded to the server otherwise.

use crate::config::AutoRestartConfig;
use crate::host::{Broadcast, CommandHandler, CommandRegistry, ServerControl};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

#[derive(Default)]
pub struct CommandTable {
    handlers: Mutex<HashMap<String, CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the handler registered for `line`, if any. Returns whether one ran.
    pub fn dispatch(&self, line: &str) -> bool {
        let handler = self.handlers.lock().get(line.trim()).cloned();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl CommandRegistry for CommandTable {
    fn register(&self, name: &str, handler: CommandHandler) {
        debug!("Registered console command {name}");
        self.handlers.lock().insert(name.to_owned(), handler);
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.handlers.lock().keys().cloned().collect();
        names.sort();
        f.debug_struct("CommandTable")
            .field("commands", &names)
            .finish()
    }
}

/// Server console over the child's stdin.
///
/// Lines are queued and written by a dedicated thread, so a server that stops
/// reading its console never stalls the caller (the main context).
pub struct ServerConsole {
    lines: mpsc::UnboundedSender<String>,
    broadcast_command: String,
    quit_command: String,
    termination: Notify,
}

impl ServerConsole {
    /// Start the console writer thread for `writer` (the server's stdin).
    pub fn new(
        writer: impl Write + Send + 'static,
        config: &AutoRestartConfig,
    ) -> io::Result<Self> {
        let (lines, mut rx) = mpsc::unbounded_channel::<String>();

        std::thread::Builder::new()
            .name("server-console".to_owned())
            .spawn(move || {
                let mut writer = writer;
                while let Some(line) = rx.blocking_recv() {
                    let written = writeln!(writer, "{line}").and_then(|()| writer.flush());
                    if let Err(e) = written {
                        warn!("Failed to write to server console: {e}");
                    }
                }
            })?;

        Ok(Self {
            lines,
            broadcast_command: config.broadcast_command.clone(),
            quit_command: config.quit_command.clone(),
            termination: Notify::new(),
        })
    }

    /// Queue one console line for the server.
    pub fn send_line(&self, line: &str) -> io::Result<()> {
        self.lines.send(line.to_owned()).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "server console writer stopped")
        })
    }

    /// Resolves once [`ServerControl::terminate`] has been called.
    pub async fn termination_requested(&self) {
        self.termination.notified().await;
    }
}

impl Broadcast for ServerConsole {
    fn broadcast(&self, message: &str) {
        let line = format!("{} {message}", self.broadcast_command);
        if let Err(e) = self.send_line(&line) {
            warn!("Failed to broadcast to server console: {e}");
        }
    }
}

impl ServerControl for ServerConsole {
    fn terminate(&self) {
        if let Err(e) = self.send_line(&self.quit_command) {
            warn!("Failed to send {} to server console: {e}", self.quit_command);
        }
        self.termination.notify_one();
    }
}

impl fmt::Debug for ServerConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConsole")
            .field("broadcast_command", &self.broadcast_command)
            .field("quit_command", &self.quit_command)
            .finish_non_exhaustive()
    }
}
