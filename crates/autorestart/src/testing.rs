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

//! In-process fakes for the host collaborators

use crate::checker::{CheckResult, UpdateSource};
use crate::host::{
    Broadcast, CommandHandler, CommandRegistry, Host, MainCallback, MainJob, Scheduler,
    ServerControl, TimerHandle,
};
use crate::version::LocalVersion;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct FakeTimer {
    initial_delay: Duration,
    interval: Duration,
    callback: MainCallback,
    handle: TimerHandle,
}

/// Scheduler driven by hand: nothing runs until the test says so.
#[derive(Default)]
pub(crate) struct FakeScheduler {
    timers: Mutex<Vec<FakeTimer>>,
    main_queue: Mutex<VecDeque<MainJob>>,
    workers: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl FakeScheduler {
    pub(crate) fn timer_specs(&self) -> Vec<(Duration, Duration)> {
        self.timers
            .lock()
            .iter()
            .map(|t| (t.initial_delay, t.interval))
            .collect()
    }

    pub(crate) fn all_timers_cancelled(&self) -> bool {
        self.timers.lock().iter().all(|t| t.handle.is_cancelled())
    }

    /// Fire every live timer once, as the main context would.
    pub(crate) fn fire(&self) {
        let callbacks: Vec<MainCallback> = self
            .timers
            .lock()
            .iter()
            .filter(|t| !t.handle.is_cancelled())
            .map(|t| t.callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn fire_including_cancelled(&self) {
        let callbacks: Vec<MainCallback> =
            self.timers.lock().iter().map(|t| t.callback.clone()).collect();
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn pending_workers(&self) -> usize {
        self.workers.lock().len()
    }

    pub(crate) async fn run_workers(&self) {
        let tasks = std::mem::take(&mut *self.workers.lock());
        for task in tasks {
            task.await;
        }
    }

    pub(crate) fn run_main(&self) {
        loop {
            let job = self.main_queue.lock().pop_front();
            match job {
                Some(job) => job(),
                None => break,
            }
        }
    }
}

impl Scheduler for FakeScheduler {
    fn schedule_repeating(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: MainCallback,
    ) -> TimerHandle {
        let handle = TimerHandle::new();
        self.timers.lock().push(FakeTimer {
            initial_delay,
            interval,
            callback,
            handle: handle.clone(),
        });
        handle
    }

    fn run_on_main(&self, job: MainJob) {
        self.main_queue.lock().push_back(job);
    }

    fn spawn_worker(&self, task: BoxFuture<'static, ()>) {
        self.workers.lock().push(task);
    }
}

/// Records broadcasts, terminations and registered commands.
#[derive(Default)]
pub(crate) struct Recorder {
    broadcasts: Mutex<Vec<String>>,
    terminations: AtomicUsize,
    commands: Mutex<HashMap<String, CommandHandler>>,
}

impl Recorder {
    pub(crate) fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().clone()
    }

    pub(crate) fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub(crate) fn command(&self, name: &str) -> Option<CommandHandler> {
        self.commands.lock().get(name).cloned()
    }
}

impl Broadcast for Recorder {
    fn broadcast(&self, message: &str) {
        self.broadcasts.lock().push(message.to_owned());
    }
}

impl ServerControl for Recorder {
    fn terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

impl CommandRegistry for Recorder {
    fn register(&self, name: &str, handler: CommandHandler) {
        self.commands.lock().insert(name.to_owned(), handler);
    }
}

pub(crate) fn fake_host(scheduler: Arc<FakeScheduler>, recorder: Arc<Recorder>) -> Host {
    Host {
        scheduler,
        broadcast: recorder.clone(),
        control: recorder.clone(),
        commands: recorder,
    }
}

/// Replays canned results in order, then reports up to date.
pub(crate) struct ScriptedSource {
    results: Mutex<VecDeque<CheckResult>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(results: Vec<CheckResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn check(&self, _version: &LocalVersion) -> CheckResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .pop_front()
            .unwrap_or(CheckResult::UpToDate)
    }
}
