use choropleth::{config, data, fetch::SourceFetcher, render, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the datasets and write the enriched map data
    Build {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map data and hover interaction over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let fetcher = SourceFetcher::new();

    match &cli.command {
        Commands::Build { config } => {
            info!("Building map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let map = data::load_map(&app_config, &fetcher).await?;
            let written = render::write_artifacts(&map, &app_config.output.dir)?;

            for path in written {
                info!("Wrote {:?}", path);
            }
            info!("Build complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // A failed load is served as an error state rather than aborting.
            let map = data::load_map(&app_config, &fetcher).await;

            server::start_server(app_config, map).await?;
        }
    }

    Ok(())
}
