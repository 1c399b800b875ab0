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

//! Host collaborators
//!
//! The monitor never talks to a concrete runtime, console or process. It is
//! handed these narrow capabilities instead, which keeps it testable with
//! fakes and lets the binary plug in a tokio main context and a wrapped
//! server console.

use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Callback run on the main context. Repeating timers invoke it once per fire.
pub type MainCallback = Arc<dyn Fn() + Send + Sync>;

/// One-shot job marshalled onto the main context.
pub type MainJob = Box<dyn FnOnce() + Send>;

/// Handler invoked when an operator command is entered.
pub type CommandHandler = Arc<dyn Fn() + Send + Sync>;

/// Serialized main context plus a pool of concurrent workers.
pub trait Scheduler: Send + Sync {
    /// Fire `callback` on the main context after `initial_delay`, then every `interval`.
    fn schedule_repeating(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: MainCallback,
    ) -> TimerHandle;

    /// Queue `job` to run on the main context.
    fn run_on_main(&self, job: MainJob);

    /// Run `task` on a worker, off the main context.
    fn spawn_worker(&self, task: BoxFuture<'static, ()>);
}

/// Broadcasts a text message to connected observers.
pub trait Broadcast: Send + Sync {
    fn broadcast(&self, message: &str);
}

/// Host process lifecycle control.
pub trait ServerControl: Send + Sync {
    /// Ask the host process to terminate.
    fn terminate(&self);
}

/// Registration of operator-invokable commands.
pub trait CommandRegistry: Send + Sync {
    fn register(&self, name: &str, handler: CommandHandler);
}

/// Cancellation handle for a repeating timer.
///
/// Clones share the same cancellation flag. Cancelling is idempotent.
#[derive(Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    on_cancel: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_cancel` when the returned handle, or a clone of it, first cancels the timer.
    #[must_use]
    pub fn with_cancel_hook(mut self, on_cancel: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(on_cancel));
        self
    }

    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(hook) = &self.on_cancel {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// The full set of collaborators the service needs from its host.
#[derive(Clone)]
pub struct Host {
    pub scheduler: Arc<dyn Scheduler>,
    pub broadcast: Arc<dyn Broadcast>,
    pub control: Arc<dyn ServerControl>,
    pub commands: Arc<dyn CommandRegistry>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
