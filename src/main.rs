//! Standalone entry point for the embedded web server.
//!
//! The real application wires in its own command router and renderer; this
//! binary serves a minimal status document so the server can be exercised
//! on its own.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use local_httpd::config::{load_config, ServerConfig};
use local_httpd::http::request::RequestContext;
use local_httpd::http::response::JsonRenderer;
use local_httpd::http::HttpServer;
use local_httpd::observability::metrics;
use local_httpd::routing::{
    Command, CommandError, CommandOutcome, CommandResult, CommandRouter, RouteError,
};
use local_httpd::session::Session;

#[derive(Parser, Debug)]
#[command(version, about = "Local web server for the embedding application")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Enable verbose debug mode (disables cache negotiation).
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_httpd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if args.debug {
        config.http.debug = true;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        debug = config.http.debug,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, Arc::new(StatusRouter), Arc::new(JsonRenderer));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Placeholder routing collaborator: the root URL answers with a status
/// document, everything else is unrouted.
struct StatusRouter;

impl CommandRouter for StatusRouter {
    fn map(
        &self,
        ctx: &RequestContext,
        _session: &Session,
    ) -> Result<Vec<Box<dyn Command>>, RouteError> {
        if ctx.path == "/" {
            Ok(vec![Box::new(StatusCommand)])
        } else {
            Err(RouteError::Usage(ctx.path.clone()))
        }
    }
}

struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    async fn run(&self, session: &mut Session) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::Done(CommandResult {
            value: serde_json::json!({
                "server": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "host": session.vars.get("http_host"),
            }),
        }))
    }

    fn etag_data(&self) -> Vec<String> {
        vec![env!("CARGO_PKG_VERSION").to_string()]
    }
}
