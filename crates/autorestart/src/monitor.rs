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

//! Periodic staleness check and the one-shot shutdown trigger
//!
//! State only changes on the main context. Check cycles run on workers and
//! hand their verdict back through [`Scheduler::run_on_main`], where the
//! state is checked and set before any side effect, so overlapping cycles
//! and results arriving after cancellation cannot fire twice.

use crate::checker::{CheckResult, UpdateSource};
use crate::error::CheckError;
use crate::host::{Broadcast, Host, MainCallback, Scheduler, ServerControl, TimerHandle};
use crate::version::{LocalVersion, RequiredVersion};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Constructed, timer not started yet
    Initial,
    /// Timer active, ticks start check cycles
    Armed,
    /// Staleness observed, shutdown issued. Terminal.
    Triggered,
    /// Torn down before any trigger. Terminal.
    Cancelled,
}

struct Lifecycle {
    state: MonitorState,
    timer: Option<TimerHandle>,
}

struct Inner {
    version: LocalVersion,
    interval: Duration,
    source: Arc<dyn UpdateSource>,
    scheduler: Arc<dyn Scheduler>,
    broadcast: Arc<dyn Broadcast>,
    control: Arc<dyn ServerControl>,
    lifecycle: Mutex<Lifecycle>,
}

/// Owns the repeating check timer and the `Armed -> Triggered` transition.
pub struct UpdateMonitor {
    inner: Arc<Inner>,
}

impl UpdateMonitor {
    pub fn new(
        version: LocalVersion,
        interval: Duration,
        source: Arc<dyn UpdateSource>,
        host: &Host,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                version,
                interval,
                source,
                scheduler: host.scheduler.clone(),
                broadcast: host.broadcast.clone(),
                control: host.control.clone(),
                lifecycle: Mutex::new(Lifecycle {
                    state: MonitorState::Initial,
                    timer: None,
                }),
            }),
        }
    }

    /// Start the repeating timer. The first check happens one interval from now.
    pub fn arm(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != MonitorState::Initial {
            debug!(state = ?lifecycle.state, "AutoRestart: monitor already armed or finished");
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let callback: MainCallback = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Inner::on_tick(&inner);
            }
        });

        let interval = self.inner.interval;
        lifecycle.timer = Some(
            self.inner
                .scheduler
                .schedule_repeating(interval, interval, callback),
        );
        lifecycle.state = MonitorState::Armed;

        info!(
            "AutoRestart: checking for updates every {}s",
            interval.as_secs()
        );
    }

    /// Stop the timer. Safe to call repeatedly, before arming, or after a trigger.
    pub fn cancel(&self) {
        let timer = {
            let mut lifecycle = self.inner.lifecycle.lock();
            if matches!(
                lifecycle.state,
                MonitorState::Initial | MonitorState::Armed
            ) {
                lifecycle.state = MonitorState::Cancelled;
            }
            lifecycle.timer.take()
        };

        if let Some(timer) = timer {
            timer.cancel();
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        self.inner.lifecycle.lock().state
    }

    /// Version sent with every check
    pub fn local_version(&self) -> &LocalVersion {
        &self.inner.version
    }
}

impl Drop for UpdateMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for UpdateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateMonitor")
            .field("version", &self.inner.version)
            .field("interval", &self.inner.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn is_armed(&self) -> bool {
        self.lifecycle.lock().state == MonitorState::Armed
    }

    /// Timer fire, on the main context. The check itself goes to a worker.
    fn on_tick(this: &Arc<Self>) {
        if !this.is_armed() {
            return;
        }

        let inner = this.clone();
        this.scheduler.spawn_worker(Box::pin(async move {
            let result = inner.source.check(&inner.version).await;
            Self::on_check_result(&inner, result);
        }));
    }

    /// Worker side of a check cycle. Never mutates state directly.
    fn on_check_result(this: &Arc<Self>, result: CheckResult) {
        match result {
            CheckResult::UpToDate => {
                debug!("AutoRestart: v{} is up to date", this.version);
            }
            CheckResult::StaleAt(required) => {
                let inner = this.clone();
                this.scheduler
                    .run_on_main(Box::new(move || inner.trigger(required)));
            }
            CheckResult::RemoteFailure(CheckError::Unsuccessful) => {
                warn!("AutoRestart: Steam API returned success=false");
            }
            CheckResult::RemoteFailure(e) => {
                error!(error = ?e, "AutoRestart: Error checking for update: {e}");
            }
        }
    }

    /// Main context only.
    fn trigger(&self, required: RequiredVersion) {
        let timer = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != MonitorState::Armed {
                debug!(
                    state = ?lifecycle.state,
                    "AutoRestart: discarding update result for v{required}"
                );
                return;
            }
            lifecycle.state = MonitorState::Triggered;
            lifecycle.timer.take()
        };

        if let Some(timer) = timer {
            timer.cancel();
        }

        let notice = format!("AutoRestart: server update detected (v{required})");
        info!("{notice}");
        self.broadcast.broadcast(&notice);
        self.control.terminate();
    }
}
