use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use query_registry::api::{self, SimulationOptions};
use query_registry::config::Config;
use query_registry::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "GraphDB Contributors")]
enum Cli {
    /// Start the query registry and its background sweeper
    Serve {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Run concurrent paging clients against an in-process registry
    Simulate {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
        #[clap(long, default_value_t = 4)]
        clients: usize,
        #[clap(long, default_value_t = 25)]
        queries: u64,
        #[clap(long, default_value_t = 1000)]
        rows: u64,
        #[clap(long, default_value_t = 100)]
        batch_size: u64,
        /// Abandon every Nth query after its first page (0 disables)
        #[clap(long, default_value_t = 5)]
        abandon_every: u64,
        /// Time-to-live of abandoned queries, in milliseconds
        #[clap(long, default_value_t = 500)]
        abandon_ttl_ms: u64,
    },
    /// Validate a config file and print the effective configuration
    CheckConfig {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli {
        Cli::Serve { config } => {
            let config = api::load_config(&config);
            logging::init(&config.log)
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            let result = api::start_service(&config).await;
            logging::shutdown();
            result?;
        }
        Cli::Simulate {
            config,
            clients,
            queries,
            rows,
            batch_size,
            abandon_every,
            abandon_ttl_ms,
        } => {
            let config = api::load_config(&config);
            logging::init(&config.log)
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            let options = SimulationOptions {
                clients,
                queries_per_client: queries,
                rows_per_query: rows,
                batch_size,
                abandon_every,
                abandon_ttl: Duration::from_millis(abandon_ttl_ms),
            };
            let result = api::run_simulation(&config, options).await;
            logging::shutdown();

            let report = result?;
            println!("Pages fetched:     {}", report.pages_fetched);
            println!("Completed queries: {}", report.completed_queries);
            println!("Abandoned queries: {}", report.abandoned_queries);
            println!("Reclaimed queries: {}", report.reclaimed_queries);
            println!("Remaining queries: {}", report.remaining_queries);
        }
        Cli::CheckConfig { config } => {
            let loaded = Config::load(&config)?;
            println!("{}", toml::to_string_pretty(&loaded)?);
        }
    }

    Ok(())
}
