// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod installer;
mod presentation;
mod rendering;

use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::report_service::ReportService;
use crate::application::server_service::ServerService;
use crate::application::streaming_service::StreamingPageService;
use crate::infrastructure::config::{load_console_config, load_meter_pages_config};
use crate::infrastructure::http_stat_repository::HttpStatRepository;
use crate::installer::apache::{configure_apache, ModuleSettings};
use crate::presentation::app_state::AppState;

#[derive(Parser)]
#[command(name = "stat-console")]
#[command(about = "Application server admin console: dashboards, PDF reports, Apache setup")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the console HTTP service (default)
    Serve,

    /// Wire the server's Apache module into httpd.conf, backing it up first
    ConfigureApache {
        /// Path to httpd.conf
        #[arg(short, long)]
        conf: PathBuf,

        /// Path to the compiled mod_caucho module
        #[arg(short, long, required_unless_present = "remove")]
        module: Option<PathBuf>,

        /// Host the module forwards requests to
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Cluster port the module forwards requests to
        #[arg(long, default_value = "6800")]
        port: u16,

        /// Only remove an existing module setup
        #[arg(long)]
        remove: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::ConfigureApache {
            conf,
            module,
            host,
            port,
            remove,
        } => {
            let settings = match (remove, module) {
                (false, Some(module_path)) => Some(ModuleSettings {
                    module_path,
                    host,
                    port,
                }),
                _ => None,
            };
            let outcome = configure_apache(&conf, settings.as_ref())?;
            tracing::info!(
                "Configured {} (backup at {})",
                conf.display(),
                outcome.backup.display()
            );
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    // Load configuration
    let console_config = load_console_config()?;
    let pages = load_meter_pages_config()?.to_pages(&console_config.report)?;
    tracing::info!("Loaded {} meter graph pages", pages.len());

    // Create repository (infrastructure layer)
    let management = &console_config.management;
    let repository = Arc::new(HttpStatRepository::new(
        management.url.clone(),
        management.token.clone(),
        Duration::from_secs(management.timeout_secs),
    )?);

    // Create services (application layer)
    let server_service = ServerService::new(repository.clone());
    let dashboard_service = DashboardService::new(repository, pages);
    let streaming_service = StreamingPageService::new(dashboard_service.clone());
    let report_service = ReportService::new(
        server_service.clone(),
        dashboard_service.clone(),
        console_config.report.clone(),
    );

    let state = Arc::new(AppState {
        server_service,
        dashboard_service,
        streaming_service,
        report_service,
    });

    // Build router (presentation layer)
    let router = presentation::router(state).layer(TraceLayer::new_for_http());

    let addr = &console_config.server.bind;
    tracing::info!("Starting stat-console service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
