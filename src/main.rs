use clap::Parser;
use flexi_logger::Logger;
use std::sync::Arc;
use tokio::net::TcpListener;

use authd::{
    app_router, AccountStore, AppState, AuthEngine, JwtConfig, JwtManager, Notifier, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "authd", about = "User-account authentication service")]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listen port
    #[arg(short, long, default_value_t = 8002)]
    port: u16,

    /// Path to the SQLite account database
    #[arg(long, default_value = "data/authd.db")]
    db_path: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;

    let settings = Settings::from_env();

    if let Some(parent) = std::path::Path::new(&cli.db_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let store = AccountStore::open(&cli.db_path)?;
    log::info!("Account store opened at {}", cli.db_path);

    let jwt = JwtManager::new(JwtConfig::new(
        settings.jwt_secret.clone(),
        settings.jwt_expiration_hours,
    ));
    let engine = AuthEngine::new(store, jwt, settings);
    let notifier = Notifier::from_env();

    let state = Arc::new(AppState { engine, notifier });
    let app = app_router(state);

    let listener = TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
