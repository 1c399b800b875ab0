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

//! AutoRestart - Entry point for the wrapper binary
//!
//! Runs the dedicated server as a child process, owns its console, and quits
//! it once Steam reports a newer required build. The exit code of the server
//! is passed through so a process manager can restart it on fresh binaries.

use anyhow::Context;
use autorestart::config::DEFAULT_CONFIG_PATH;
use autorestart::console::{CommandTable, ServerConsole};
use autorestart::process::{ServerProcess, exit_code};
use autorestart::runtime::MainContext;
use autorestart::{AutoRestart, AutoRestartConfig, Host, Scheduler, UpToDateClient, load_config};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

const STOP_TIMEOUT: Duration = Duration::from_secs(30);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "autorestart")]
#[command(about = "Quit a dedicated server once Steam reports an update", long_about = None)]
struct Cli {
    /// Path to the JSON config (created with defaults if missing)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory containing steam.inf (overrides the config)
    #[arg(long)]
    install_dir: Option<PathBuf>,

    /// Server command line, after `--`
    #[arg(last = true, required = true)]
    server: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("autorestart=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(install_dir) = cli.install_dir {
        config.install_dir = install_dir;
    }
    info!(
        "Loaded config: check_interval={}s, metadata={}",
        config.check_interval_secs,
        config.metadata_path().display()
    );

    let (program, args) = cli
        .server
        .split_first()
        .context("missing server command")?;
    let source = Arc::new(UpToDateClient::from_config(&config)?);

    // From here on a dropped ServerProcess kills the server
    let server = ServerProcess::new(program, args);
    let stdin = server.start()?;

    let console = Arc::new(ServerConsole::new(stdin, &config)?);
    let commands = Arc::new(CommandTable::new());
    let (main_ctx, main_task) = MainContext::start();

    let host = Host {
        scheduler: Arc::new(main_ctx.clone()),
        broadcast: console.clone(),
        control: console.clone(),
        commands: commands.clone(),
    };
    let autorestart = AutoRestart::load(&config, &host, source);

    forward_operator_input(main_ctx.clone(), commands, console.clone());

    let supervised = supervise(&server, &console, &config).await;

    autorestart.unload();
    let code = match supervised {
        Ok(code) => code,
        Err(e) => {
            error!("Supervision failed: {e:#}");
            server.stop(STOP_TIMEOUT).await?;
            main_ctx.shutdown();
            return Err(e);
        }
    };

    main_ctx.shutdown();
    let _ = main_task.await;

    info!("Exiting with code {code}");
    std::process::exit(code);
}

/// Operator lines run registered commands on the main context, everything
/// else goes to the server console.
fn forward_operator_input(
    main_ctx: MainContext,
    commands: Arc<CommandTable>,
    console: Arc<ServerConsole>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let commands = commands.clone();
                    let console = console.clone();
                    main_ctx.run_on_main(Box::new(move || {
                        if !commands.dispatch(&line)
                            && let Err(e) = console.send_line(&line)
                        {
                            error!("Failed to forward console input: {e}");
                        }
                    }));
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read operator input: {e}");
                    break;
                }
            }
        }
    });
}

async fn supervise(
    server: &ServerProcess,
    console: &ServerConsole,
    config: &AutoRestartConfig,
) -> anyhow::Result<i32> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut exit_poll = tokio::time::interval(EXIT_POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = exit_poll.tick() => {
                if let Some(status) = server.try_exit_status()? {
                    info!("Server exited with {status}");
                    return Ok(exit_code(status));
                }
            }
            () = console.termination_requested() => {
                info!(
                    "Termination requested, waiting up to {}s for the server to exit",
                    config.quit_grace_secs
                );
                if let Some(status) = server.wait_for_exit(config.quit_grace()).await? {
                    info!("Server exited with {status}");
                    return Ok(exit_code(status));
                }
                server.stop(STOP_TIMEOUT).await?;
                return Ok(0);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping server");
                server.stop(STOP_TIMEOUT).await?;
                return Ok(130);
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, stopping server");
                server.stop(STOP_TIMEOUT).await?;
                return Ok(143);
            }
        }
    }
}
