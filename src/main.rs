use std::sync::Arc;

use bb8_postgres::bb8::Pool;
use bb8_postgres::tokio_postgres::NoTls;
use bb8_postgres::PostgresConnectionManager;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

use menu_decoder_backend::config::Config;
use menu_decoder_backend::controller;
use menu_decoder_backend::repositories::postgres_repo::PostgresConnectionRepo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::parse();

    let manager =
        PostgresConnectionManager::new_from_stringlike(&config.database_url, NoTls)?;
    let postgres_connection = Pool::builder().build(manager).await?;

    let postgres_repo = Arc::new(PostgresConnectionRepo::new(postgres_connection.clone()));
    postgres_repo.init_schema().await?;
    info!("Database schema ready, starting server in {} mode", config.environment);

    controller::serve(postgres_connection, &config).await
}
