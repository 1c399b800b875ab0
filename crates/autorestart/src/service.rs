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

//! Component lifecycle: load, arm, unload

use crate::checker::UpdateSource;
use crate::config::AutoRestartConfig;
use crate::host::{CommandRegistry, Host, ServerControl};
use crate::monitor::UpdateMonitor;
use crate::version::resolve_local_version;
use std::sync::Arc;
use tracing::{error, info};

/// The loaded component. Inert when the local version could not be resolved.
#[derive(Debug)]
pub struct AutoRestart {
    monitor: Option<UpdateMonitor>,
}

impl AutoRestart {
    pub fn load(config: &AutoRestartConfig, host: &Host, source: Arc<dyn UpdateSource>) -> Self {
        register_manual_quit(
            host.commands.as_ref(),
            &config.manual_quit_command,
            host.control.clone(),
        );

        let version = match resolve_local_version(&config.metadata_path()) {
            Ok(version) => version,
            Err(e) => {
                error!("AutoRestart: {e}");
                error!("AutoRestart: Failed to get current version, plugin disabled");
                return Self { monitor: None };
            }
        };

        info!("AutoRestart: Current version is {version}");
        let monitor = UpdateMonitor::new(version, config.check_interval(), source, host);
        monitor.arm();

        Self {
            monitor: Some(monitor),
        }
    }

    pub fn unload(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.cancel();
        }
    }

    pub fn monitor(&self) -> Option<&UpdateMonitor> {
        self.monitor.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.monitor.is_some()
    }
}

/// Register the operator escape hatch that quits without a version check.
pub fn register_manual_quit(
    registry: &dyn CommandRegistry,
    name: &str,
    control: Arc<dyn ServerControl>,
) {
    let command = name.to_owned();
    registry.register(
        name,
        Arc::new(move || {
            info!("AutoRestart: {command} command executed, quitting server.");
            control.terminate();
        }),
    );
}
