mod app;
mod completion;
mod config;
mod http;
mod inbound;
mod relay;
mod upstream;
mod verifier;
mod whatsapp;

#[cfg(test)]
mod test_utils;

use crate::app::AppHandles;
use crate::config::AppConfig;
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const VERSION: &str = env!("VERSION");

#[derive(Parser)]
#[command(name = "whatsapp-relay")]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version = VERSION)]
struct CliArguments {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    check: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!("build version: {VERSION}");
}

/// What to do once configuration has been loaded and checked.
#[derive(Debug, PartialEq, Eq)]
enum Startup {
    Serve,
    Exit,
}

/// Fails on missing credentials, otherwise decides whether to start serving.
/// With `check_only` nothing is bound and the process exits successfully.
fn preflight(config: &AppConfig, check_only: bool) -> Result<Startup> {
    if let Err(e) = config.check() {
        error!("{e}");
        error!("Please configure your .env file with the required credentials.");
        return Err(e);
    }
    info!("All required environment variables are configured!");

    Ok(if check_only {
        Startup::Exit
    } else {
        Startup::Serve
    })
}

fn main() -> Result<()> {
    dotenv().ok();

    init_tracing();
    let args = CliArguments::parse();
    let config = AppConfig::load(args.config)?;

    if preflight(&config, args.check)? == Startup::Exit {
        return Ok(());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async move {
            let handles = AppHandles::new(config).await?;
            handles.run().await;
            Ok(())
        })
}
