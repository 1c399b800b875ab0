// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Wrapped dedicated server process

use crate::error::{AutoRestartError, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::PathBuf;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code to report for a finished server, `128 + signal` when it was killed.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

/// Owns the dedicated server child. Restarting it is left to whatever
/// supervises this process.
#[derive(Debug)]
pub struct ServerProcess {
    child: Mutex<Option<Child>>,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ServerProcess {
    /// Create a supervisor for `program`; nothing is spawned until [`Self::start`].
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Self {
        Self {
            child: Mutex::new(None),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Spawn the server with a piped console and hand back its stdin.
    pub fn start(&self) -> Result<ChildStdin> {
        let mut child_guard = self.child.lock();
        if child_guard.is_some() {
            return Err(AutoRestartError::Process(
                "Server process is already running".to_owned(),
            ));
        }

        info!("Starting server: {}", self.program.display());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AutoRestartError::Process(format!(
                    "Failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AutoRestartError::Process("Server stdin was not captured".to_owned())
        })?;

        info!("Server started with PID: {}", child.id());
        *child_guard = Some(child);

        Ok(stdin)
    }

    /// Check if the server is still running
    pub fn is_running(&self) -> bool {
        let mut child_guard = self.child.lock();
        match child_guard.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_)) | Err(_)) | None => false,
        }
    }

    /// Get the server process ID
    pub fn pid(&self) -> Option<u32> {
        self.child.lock().as_ref().map(Child::id)
    }

    /// Exit status if the server has exited. The child is released once reaped.
    pub fn try_exit_status(&self) -> Result<Option<ExitStatus>> {
        let mut child_guard = self.child.lock();
        let Some(child) = child_guard.as_mut() else {
            return Ok(None);
        };

        let status = child.try_wait()?;
        if status.is_some() {
            *child_guard = None;
        }
        Ok(status)
    }

    /// Wait up to `timeout` for the server to exit on its own.
    pub async fn wait_for_exit(&self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.try_exit_status()? {
                return Ok(Some(status));
            }
            if self.pid().is_none() || start.elapsed() >= timeout {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Graceful stop: SIGTERM, then SIGKILL once `timeout` passes.
    pub async fn stop(&self, timeout: Duration) -> Result<()> {
        let Some(mut child) = self.child.lock().take() else {
            return Ok(());
        };

        info!("Stopping server PID: {}", child.id());

        let pid = Pid::from_raw(child.id() as i32);
        if let Err(e) = signal::kill(pid, Signal::SIGTERM) {
            warn!("Failed to send SIGTERM: {e}");
        }

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!("Server stopped gracefully ({status})");
                    return Ok(());
                }
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        warn!("Server did not stop gracefully, killing");
                        child.kill()?;
                        let _ = child.wait();
                        info!("Server killed");
                        return Ok(());
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    warn!("Error checking server status: {e}");
                    child.kill()?;
                    let _ = child.wait();
                    return Ok(());
                }
            }
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.get_mut().take() {
            warn!("Server PID {} still running, killing", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
