//! `mailfang` - terminal client for the mailfang email testing server
//!
//! Lists, shows and deletes captured mail over the HTTP API and follows new
//! mail over the push channel.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod watch;

use std::time::Duration;

use clap::Parser;
use mailfang_api::ApiClient;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use cli::{Cli, Command};

/// Shared state for one invocation.
pub struct Context {
    /// API client for the configured server.
    pub api: ApiClient,
    /// Server base URL, also the base of viewer links.
    pub server: Url,
    /// Whether output is JSON.
    pub json: bool,
    /// Push channel reconnect delay.
    pub reconnect_interval: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailfang=info,mailfang_realtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    debug!(server = %cli.server, "starting mailfang");

    let ctx = Context {
        api: ApiClient::new(cli.server.clone()),
        server: cli.server,
        json: cli.json,
        reconnect_interval: Duration::from_millis(cli.reconnect_interval_ms),
    };

    match cli.command {
        Command::List(args) => commands::list(&ctx, args).await,
        Command::Show { id } => commands::show(&ctx, &id).await,
        Command::Delete { id, all } => commands::delete(&ctx, id.as_deref(), all).await,
        Command::Raw { id } => commands::raw(&ctx, &id).await,
        Command::Rendered {
            id,
            allow_remote_content,
        } => commands::rendered(&ctx, &id, allow_remote_content).await,
        Command::Sidebar => commands::sidebar(&ctx).await,
        Command::Copy { id } => commands::copy(&ctx, &id).await,
        Command::Watch { notify } => watch::run(&ctx, notify).await,
        Command::Open { path, print } => commands::open(&ctx, &path, print).await,
    }
}
