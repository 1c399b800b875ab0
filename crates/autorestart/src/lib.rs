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

//! AutoRestart - shuts a dedicated server down once its build goes stale
//!
//! The installed version is read from the server's `steam.inf` at startup and
//! checked against Steam's `UpToDateCheck` endpoint on a fixed interval. When
//! the server is reported out of date, players are told and the server is
//! sent `quit`, once. Bringing it back up on the new build is left to the
//! external process manager.

pub mod checker;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod monitor;
pub mod process;
pub mod runtime;
pub mod service;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use checker::{CheckResult, UpToDateClient, UpdateSource};
pub use config::{AutoRestartConfig, load_config};
pub use error::{AutoRestartError, CheckError, ResolveError};
pub use host::{Broadcast, CommandRegistry, Host, Scheduler, ServerControl, TimerHandle};
pub use monitor::{MonitorState, UpdateMonitor};
pub use service::AutoRestart;
pub use version::{LocalVersion, RequiredVersion, resolve_local_version};
