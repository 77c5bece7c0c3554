//! extension-splunk CLI
//!
//! Serves the Splunk Observability extension to the chaos-engineering host.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use extension_splunk::api::{AppState, start_api_server, start_health_server};
use extension_splunk::checks::{ActionRegistry, web_console_url};
use extension_splunk::client::SplunkClient;
use extension_splunk::config::ExtensionConfig;
use extension_splunk::discovery::{
    CachedDiscovery, DetectorDiscovery, Discovery, REFRESH_INTERVAL, SloDiscovery,
};
use extension_splunk::events::{EventForwarder, StepExecutionStore};

/// Splunk Observability extension
#[derive(Debug, Parser)]
#[command(name = "extension-splunk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the extension API and health probes (default)
    Serve(ExtensionConfig),

    /// List available actions and discoveries
    List,

    /// Validate the configuration and exit
    Validate(ExtensionConfig),
}

/// Configuration read from the environment when no subcommand is given
#[derive(Debug, Parser)]
#[command(name = "extension-splunk")]
struct DefaultServe {
    #[command(flatten)]
    config: ExtensionConfig,
}

fn setup_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Serve(DefaultServe::parse_from(["extension-splunk"]).config));

    match command {
        Commands::Serve(config) => serve(config).await,
        Commands::List => list(),
        Commands::Validate(config) => validate(&config),
    }
}

/// Run the extension until SIGINT/SIGTERM
async fn serve(config: ExtensionConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api_base_url,
        ingest = %config.ingest_base_url,
        "Starting Splunk extension"
    );

    let api = config
        .api_client()
        .context("Failed to create Splunk API client")?;
    let ingest = config
        .ingest_client()
        .context("Failed to create Splunk ingest client")?;

    let actions = ActionRegistry::splunk(api.clone(), &web_console_url(&config.api_base_url));
    let discoveries = vec![
        CachedDiscovery::new(Arc::new(DetectorDiscovery::new(
            api.clone(),
            config.discovery_attributes_excludes_detector.clone(),
        ))),
        CachedDiscovery::new(Arc::new(SloDiscovery::new(
            api,
            config.discovery_attributes_excludes_slo.clone(),
        ))),
    ];
    let refresh_tasks: Vec<_> = discoveries
        .iter()
        .map(|d| d.spawn_refresh(REFRESH_INTERVAL))
        .collect();

    let state = AppState::new(
        actions,
        discoveries,
        EventForwarder::new(ingest, StepExecutionStore::new()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let wait_for = |mut rx: watch::Receiver<bool>| async move {
        let _ = rx.wait_for(|stop| *stop).await;
    };

    let health = tokio::spawn(start_health_server(
        config.health_port,
        state.clone(),
        wait_for(shutdown_rx.clone()),
    ));

    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let served = start_api_server(config.port, state, wait_for(shutdown_rx)).await;

    for task in refresh_tasks {
        task.abort();
    }
    match health.await {
        Ok(Err(e)) => tracing::error!(error = %e, "Health server error"),
        Err(e) => tracing::error!(error = %e, "Health server task failed"),
        Ok(Ok(())) => {}
    }

    served.with_context(|| format!("Failed to serve extension API on port {}", config.port))?;
    tracing::info!("Extension stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// List available actions and discoveries
fn list() -> Result<()> {
    // Descriptions never hit the network; any well-formed client will do
    let client = SplunkClient::api("https://api.us1.signalfx.com", "unused")
        .context("Failed to create Splunk API client")?;
    let actions = ActionRegistry::splunk(client.clone(), "https://app.us1.signalfx.com");

    println!("Available actions:");
    println!();
    for action in actions.iter() {
        let description = action.describe();
        println!("  {:50} - {}", description.id, description.description);
    }

    println!();
    println!("Available discoveries:");
    println!();
    let discoveries: [Arc<dyn Discovery>; 2] = [
        Arc::new(DetectorDiscovery::new(client.clone(), Vec::new())),
        Arc::new(SloDiscovery::new(client, Vec::new())),
    ];
    for discovery in discoveries {
        let target = discovery.describe_target();
        println!("  {:50} - {}", target.id, target.label.other);
    }

    Ok(())
}

/// Validate the configuration
fn validate(config: &ExtensionConfig) -> Result<()> {
    tracing::info!("Validating configuration");

    config.validate().context("Invalid configuration")?;
    config
        .api_client()
        .context("Failed to create Splunk API client")?;
    config
        .ingest_client()
        .context("Failed to create Splunk ingest client")?;

    println!("Configuration is valid!");
    println!();
    println!("API base URL:    {}", config.api_base_url);
    println!("Ingest base URL: {}", config.ingest_base_url);
    println!("Web console:     {}", web_console_url(&config.api_base_url));
    println!("Port:            {}", config.port);
    println!("Health port:     {}", config.health_port);

    for (name, excludes) in [
        ("detector", &config.discovery_attributes_excludes_detector),
        ("SLO", &config.discovery_attributes_excludes_slo),
    ] {
        if !excludes.is_empty() {
            println!("Excluded {name} attributes: {}", excludes.join(", "));
        }
    }

    Ok(())
}
