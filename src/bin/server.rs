//! `cybersentinel-soar` server binary: wires the in-memory persistence
//! layer, the stub connectors, the security filter, and the execution
//! engine into an axum HTTP service.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use anyhow::Context;
use clap::Parser;
use cybersentinel_soar::api::{self, AppState};
use cybersentinel_soar::connectors::registry::ConnectorRegistry;
use cybersentinel_soar::connectors::stubs::{EnrichmentStub, FirewallStub};
use cybersentinel_soar::engine::Engine;
use cybersentinel_soar::persistence::memory::InMemoryStore;
use cybersentinel_soar::security::filter::SecurityFilter;
use cybersentinel_soar::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Overrides environment-sourced configuration with explicit flags. Absent
/// flags leave `AppConfig::load_from_env`'s values untouched.
#[derive(Parser)]
#[command(name = "cybersentinel-soar")]
#[command(about = "SOAR execution engine core: webhook ingestion and playbook orchestration")]
#[command(version)]
struct Cli {
    /// Port to listen on, overriding $PORT.
    #[arg(short, long)]
    port: Option<u16>,
    /// Host to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_env().context("failed to load configuration")?;

    let level = config.logging.level.clone();
    let subscriber = tracing_subscriber::fmt().with_env_filter(level);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(service = %config.service.name, version = %config.service.version, "starting");

    let store = Arc::new(InMemoryStore::new());

    let mut registry = ConnectorRegistry::new();
    registry.register("abuseipdb", Arc::new(EnrichmentStub::default()));
    registry.register("firewall", Arc::new(FirewallStub::default()));

    let engine = Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(registry),
        config.sla.clone(),
        config.persistence.max_concurrent_executions,
    );

    let sweep_interval = Duration::from_secs(config.security.approval_sweep_interval_secs);
    let approval_sweeper = Arc::new(engine.clone().spawn_approval_sweeper(sweep_interval));

    let security = Arc::new(SecurityFilter::new(&config.security));
    let sweeper_security = security.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            sweeper_security.sweep(std::time::Instant::now());
        }
    });

    let state = AppState {
        engine,
        security,
        webhooks: store.clone(),
        triggers: store.clone(),
        audit: store.clone(),
        security_config: config.security.clone(),
        approval_sweeper,
    };

    let router = api::router(state);

    let port = cli
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", cli.host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.host, port))?;
    let listener = tokio::net::TcpListener::bind(addr).await.context("failed to bind listener")?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
