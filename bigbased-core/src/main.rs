use anyhow::Result;
use bigbased_core::cache::NoOpCacheManager;
use bigbased_core::service::TenantResolver;
use bigbased_core::{config::Config, migration, server, telemetry};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "bigbased-core",
    about = "Tenant resolution service for the Big Based platform",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database if needed and apply pending migrations
    Migrate,
    /// Resolve a host once and print the tenant config as JSON
    Resolve {
        /// Raw host, e.g. `www.basedbook.com:443`
        host: String,
        /// Skip both cache tiers and read straight from the database
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let prometheus_handle = telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting Big Based Core");
            info!("HTTP server listening on {}", config.http_addr());
            server::run(config, prometheus_handle).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
        Command::Resolve { host, no_cache } => {
            let (resolver, _cache) = server::build_resolver(&config)?;
            let resolved = if no_cache {
                let uncached = TenantResolver::new(
                    Arc::new(resolver.repository().clone()),
                    Arc::new(NoOpCacheManager::new()),
                    config.tenancy.clone(),
                );
                uncached.resolve(&host).await
            } else {
                resolver.resolve(&host).await
            };
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(())
        }
    }
}
