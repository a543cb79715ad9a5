use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod friendship;
mod location;
mod models;
mod notify;
mod password;
mod presence;
mod realtime;
mod repositories;
mod routes;
mod state;
mod validation;

use std::sync::Arc;

use common::database;

use crate::repositories::{PgUserStore, UserStore};
use crate::state::AppState;

/// Server bind configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3001);

        Self { host, port }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting FoundYou API service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Apply pending migrations
    sqlx::migrate!().run(&pool).await?;

    info!("FoundYou API service initialized successfully");

    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));
    let app_state = AppState::new(store);

    // Start the web server
    let app = routes::create_router(app_state);

    let config = ServerConfig::from_env();
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "FoundYou API service listening on {}:{}",
        config.host, config.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
