//! Mail Assist Worker - Backend service for templated email sending
//!
//! This worker connects to NATS and handles template and mail requests
//! from the frontend gateway.

mod cli;
mod config;
mod db;
mod error;
mod handlers;
mod offline;
mod services;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::services::credits::PgCreditLedger;
use crate::services::email_sender::{EmailSender, LogEmailSender, ResendEmailSender};
use crate::services::mailing::MailingService;
use crate::services::rate_limiter::SendRateLimiter;
use crate::services::template_store::PgTemplateStore;
use crate::types::FallbackPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Offline rendering writes documents to stdout; keep logs off it.
    if let Some(Command::Render { template, rows, preview }) = &cli.command {
        let template_json = std::fs::read_to_string(template)
            .with_context(|| format!("Failed to read {}", template.display()))?;
        let rows_csv = rows
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            })
            .transpose()?;
        let policy = if *preview { FallbackPolicy::Preview } else { FallbackPolicy::Send };

        for document in offline::render_documents(&template_json, rows_csv.as_deref(), policy).await? {
            println!("{}", document);
        }
        return Ok(());
    }

    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,mail_assist_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let pool = db::create_pool(config.require_database_url()?).await?;
    info!("Connected to PostgreSQL");

    db::run_migrations(&pool).await?;
    info!("Database migrations complete");

    if matches!(cli.command, Some(Command::Migrate)) {
        return Ok(());
    }

    info!("Starting Mail Assist Worker...");

    let sender: Arc<dyn EmailSender> = match &config.resend_api_key {
        Some(key) => {
            info!("Mail sender: Resend");
            Arc::new(ResendEmailSender::new(key.clone()))
        }
        None => {
            warn!("RESEND_API_KEY not set - outgoing mail will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let limiter = Arc::new(SendRateLimiter::new(config.rate_limit_config()));
    let cleanup_limiter = Arc::clone(&limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    let mailing = Arc::new(MailingService::new(
        Arc::new(PgTemplateStore::new(pool.clone())),
        sender,
        Arc::new(PgCreditLedger::new(pool)),
        limiter,
        config.mailing_config(),
    ));

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    if let Err(e) = handlers::start_handlers(nats_client, mailing).await {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}
