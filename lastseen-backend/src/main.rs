use lastseen_backend::{Host, config::Config, console};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting LastSeen console host...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: data_dir={}, store_id={}, debug={}",
        config.data_dir,
        config.store_id,
        config.debug
    );

    let host = Host::from_config(&config);
    tracing::info!("Ready. Commands: join <player>, quit <player>, seen <player>, firstseen <player>, exit");

    console::run(&host, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!("Shutting down");
    Ok(())
}
