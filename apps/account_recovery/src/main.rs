use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{load_settings, FlowOptions, HttpAccountService, PasswordResetFlow};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod console;

#[derive(Parser, Debug)]
#[command(about = "Reset a forgotten storefront account password")]
struct Args {
    /// Settings file; defaults to ./account_recovery.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    login_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("failed to load settings")?;
    if let Some(v) = args.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = args.login_url {
        settings.login_url = v;
    }
    info!(api_base_url = %settings.api_base_url, "starting account recovery");

    let service = HttpAccountService::from_settings(&settings)
        .context("failed to set up account service client")?;
    let mut flow = PasswordResetFlow::new(Arc::new(service), FlowOptions::from_settings(&settings));

    let (ui_tx, ui_rx) = mpsc::channel(32);
    let console = tokio::spawn(console::run(
        flow.subscribe(),
        console::spawn_stdin_reader(),
        ui_tx,
    ));

    let destination = flow.run(ui_rx).await;
    match destination {
        Some(destination) => println!("Continue to sign in: {destination}"),
        None => println!("Password reset cancelled."),
    }

    console.await.context("console task panicked")?
}
