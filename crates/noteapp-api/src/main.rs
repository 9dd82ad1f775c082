//! noteapp-api - HTTP API server for noteapp

use tracing::info;

use noteapp_api::{
    logging::{init_logging, LogConfig},
    router, AppState, ServerConfig,
};
use noteapp_db::{redact_database_url, Database, PoolConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _file_guard = init_logging(&LogConfig::from_env());

    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr()?;

    // Connect to database
    info!(
        database = %redact_database_url(&config.database_url),
        max_connections = config.db_max_connections,
        "Connecting to database..."
    );
    let pool_config = PoolConfig::new().max_connections(config.db_max_connections);
    let db = Database::connect_with_config(&config.database_url, pool_config).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    let app = router(AppState::from_database(db), config.allowed_origins);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
