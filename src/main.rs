// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `devnotify` server binary.
//!
//! ```text
//! devnotify                      # bind the configured address (default 127.0.0.1:9999)
//! devnotify 0.0.0.0 5005         # override host and port
//! devnotify -c /etc/devnotify.json --log-level debug
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use devnotify::config::ServerConfig;
use devnotify::event;
use devnotify::server::Server;
use devnotify::{Error, Result};

/// UDP device state server with change notifications.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Host to bind (requires PORT).
    #[arg(requires = "port")]
    host: Option<String>,

    /// Port to bind.
    #[arg(requires = "host")]
    port: Option<u16>,

    /// Device configuration file.
    #[arg(short, long, default_value = "devices.json")]
    config: PathBuf,

    /// Log filter, e.g. `info` or `devnotify=debug`. Overrides `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| Error::Config(format!("cannot resolve '{host}'")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

async fn run(args: Args) -> Result<()> {
    let mut config = ServerConfig::load(&args.config)?;
    if let (Some(host), Some(port)) = (args.host.as_deref(), args.port) {
        config.bind = resolve(host, port).await?;
    }

    let (tx, rx) = event::channel(config.event_capacity);

    #[cfg(feature = "watch")]
    let _watcher = event::FileWatcher::spawn(config.device_paths(), tx)?;
    #[cfg(not(feature = "watch"))]
    {
        drop(tx);
        tracing::warn!("Built without the `watch` feature, change notifications are disabled");
    }

    let server = Server::from_config(&config).await?;
    server.run(rx, shutdown_signal()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Error running server");
            ExitCode::FAILURE
        }
    }
}
