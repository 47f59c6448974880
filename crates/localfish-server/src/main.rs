use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod config;

use app::Application;
use config::{Cli, Config, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;
    init_logging(config.logging.format);
    info!(config = %cli.config.display(), "loaded configuration");

    let app = match Application::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!("failed to start: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("application initialized");

    app.run().await?;

    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
