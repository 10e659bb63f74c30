use clap::Parser;
use esgate::config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Signing gateway for AWS Elasticsearch Service domains.
#[derive(Parser)]
#[command(name = "esgate")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short, default_value = "esgate.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %cli.config.display(), error = %err, "failed to load config");
            std::process::exit(1);
        }
    };

    if let Err(err) = esgate::run(config).await {
        tracing::error!(error = %err, "gateway exited");
        std::process::exit(1);
    }
}
