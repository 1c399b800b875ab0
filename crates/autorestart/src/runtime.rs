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

//! Tokio-backed host scheduler
//!
//! The main context is a single task draining a queue of jobs, so everything
//! submitted through [`Scheduler::run_on_main`] runs one at a time and in
//! submission order. Workers are plain tokio tasks.

use crate::host::{MainCallback, MainJob, Scheduler, TimerHandle};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct MainContext {
    tx: mpsc::UnboundedSender<MainJob>,
    stop: Arc<Notify>,
}

impl MainContext {
    /// Start the main context on the current tokio runtime.
    ///
    /// The returned task finishes after [`MainContext::shutdown`] once the
    /// jobs already queued have run.
    pub fn start() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<MainJob>();
        let stop = Arc::new(Notify::new());
        let stop_rx = stop.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    job = rx.recv() => match job {
                        Some(job) => job(),
                        None => break,
                    },
                    () = stop_rx.notified() => {
                        rx.close();
                        while let Ok(job) = rx.try_recv() {
                            job();
                        }
                        break;
                    }
                }
            }
            debug!("Main context stopped");
        });

        (Self { tx, stop }, task)
    }

    pub fn shutdown(&self) {
        self.stop.notify_one();
    }
}

impl Scheduler for MainContext {
    fn schedule_repeating(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: MainCallback,
    ) -> TimerHandle {
        let handle = TimerHandle::new();
        let ticker_handle = handle.clone();
        let tx = self.tx.clone();

        let ticker = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + initial_delay, interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if ticker_handle.is_cancelled() {
                    break;
                }

                let callback = callback.clone();
                let timer = ticker_handle.clone();
                // A fire queued before cancellation is dropped on the main context
                let job: MainJob = Box::new(move || {
                    if !timer.is_cancelled() {
                        callback();
                    }
                });
                if tx.send(job).is_err() {
                    break;
                }
            }
        });

        let abort = ticker.abort_handle();
        handle.with_cancel_hook(move || abort.abort())
    }

    fn run_on_main(&self, job: MainJob) {
        if self.tx.send(job).is_err() {
            debug!("Main context stopped, dropping job");
        }
    }

    fn spawn_worker(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}
