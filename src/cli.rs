use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use crate::app::{build_router, AppState};
use crate::config::{AppConfig, StoreBackend};
use crate::database::DatabaseManager;
use crate::mail::mailer_from_config;
use crate::scheduler::mail_digest_job;

#[derive(Parser)]
#[command(name = "recruit-api")]
#[command(about = "Recruitment platform API server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Use the in-memory store instead of PostgreSQL")]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Seed permissions, roles and users into an empty store")]
    Seed,

    #[command(about = "Send the job digest to every subscriber once")]
    MailDigest,
}

pub async fn run(cli: Cli, base: &AppConfig) -> anyhow::Result<()> {
    let mut config = base.clone();
    if cli.memory {
        config.database.backend = StoreBackend::Memory;
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(Arc::new(config)).await
        }
        Commands::Seed => {
            config.bootstrap.should_init = true;
            let state = build_state(Arc::new(config)).await?;
            let report = state.bootstrap.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::MailDigest => {
            let state = build_state(Arc::new(config)).await?;
            let report = state.mail.send_digest().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn build_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let store = DatabaseManager::connect_store(&config)
        .await
        .context("failed to connect to the document store")?;
    let mailer = mailer_from_config(&config.mail).context("failed to configure mail transport")?;
    Ok(AppState::new(config, store, mailer))
}

async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let state = build_state(config.clone()).await?;
    state.bootstrap.run().await.context("bootstrap failed")?;

    if config.mail.digest_enabled {
        let job = mail_digest_job(state.mail.clone(), &config.mail.digest_schedule)?;
        info!("scheduling {} with '{}'", job.name(), config.mail.digest_schedule);
        job.spawn();
    }

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Recruit API listening on http://{} ({:?})", bind_addr, config.environment);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
