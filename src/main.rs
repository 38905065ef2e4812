use clap::Parser;
use recruit_api::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT secrets, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let cli = Cli::parse();
    let config = recruit_api::config::config();
    tracing::info!("Starting Recruit API in {:?} mode", config.environment);

    if let Err(e) = recruit_api::cli::run(cli, config).await {
        match std::env::var("RUST_BACKTRACE").as_deref() {
            Ok("1") | Ok("full") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}
