pub mod admin;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;
use vivero_storefront::config::{ConfigError, get_database_url};
use vivero_storefront::db;

/// Errors shared by every command that needs the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the store database named by the environment.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
