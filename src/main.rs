use clap::Parser;
use dotenv::dotenv;

use orderwatch::cli::{self, Cli, Commands};
use orderwatch::commands::{run_flip, run_markets, run_watch};
use orderwatch::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.verbose);

    match cli.command {
        Commands::Watch {
            product_id,
            interval_ms,
            max_missing_fetch,
            event_capacity,
            auto_flip,
            metrics_port,
            exchange,
        } => {
            let config = cli::watch_config(
                product_id,
                interval_ms,
                max_missing_fetch,
                event_capacity,
                auto_flip,
                metrics_port,
                &exchange,
            );
            run_watch(config).await?;
        }
        Commands::Flip { order_id, exchange } => {
            run_flip(order_id, exchange.to_config()).await?;
        }
        Commands::Markets { markets_file, json } => {
            run_markets(markets_file, json)?;
        }
    }

    Ok(())
}
