use std::sync::Arc;
use std::time::Duration;

use bb8_postgres::bb8::Pool;
use bb8_postgres::tokio_postgres::NoTls;
use bb8_postgres::PostgresConnectionManager;
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info, warn};

use menu_decoder_backend::config::Config;
use menu_decoder_backend::helpers::openrouter::OpenRouterClient;
use menu_decoder_backend::repositories::postgres_repo::PostgresConnectionRepo;
use menu_decoder_backend::services::cuisine_catalog::CuisineCatalogService;

const CUISINES: [&str; 20] = [
    "Japanese",
    "Chinese",
    "Korean",
    "Thai",
    "Vietnamese",
    "Indian",
    "Mexican",
    "Italian",
    "French",
    "Spanish / Tapas",
    "Greek",
    "Turkish",
    "Lebanese / Middle Eastern",
    "Moroccan",
    "Ethiopian",
    "Peruvian",
    "Brazilian",
    "American BBQ",
    "German",
    "Malaysian",
];

// Pacing between generation calls, not a backoff scheme.
const PACING_DELAY_SECS: u64 = 2;

#[derive(Parser)]
struct PreGenerateArgs {
    #[clap(flatten)]
    config: Config,

    /// A cuisine holding at least this many cached English rows is treated
    /// as fully populated and skipped.
    #[clap(long, default_value_t = 5)]
    populated_threshold: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = PreGenerateArgs::parse();

    let manager =
        PostgresConnectionManager::new_from_stringlike(&args.config.database_url, NoTls)?;
    let postgres_connection = Pool::builder().build(manager).await?;
    let postgres_repo = Arc::new(PostgresConnectionRepo::new(postgres_connection));
    postgres_repo.init_schema().await?;

    let http_client = reqwest::Client::new();
    let cuisine_service = CuisineCatalogService::new(
        postgres_repo.clone(),
        OpenRouterClient::new(
            http_client.clone(),
            args.config.openrouter_api_key.clone(),
        ),
        http_client,
        args.config.unsplash_key.clone(),
    );

    info!("Starting pre-generation of cuisine data");

    for cuisine in CUISINES {
        let existing = postgres_repo
            .count_generic_dishes(&cuisine.to_string(), &"en".to_string())
            .await?;
        if existing >= args.populated_threshold {
            info!("[SKIP] {} already has {} dishes cached", cuisine, existing);
            continue;
        }

        info!("[GENERATING] {}", cuisine);
        match cuisine_service.lookup_cuisine(cuisine, "English", "en").await {
            Ok(outcome) => {
                if outcome.limit_reached {
                    warn!("[LIMIT] Daily LLM quota reached, stopping at {}", cuisine);
                    break;
                }
                info!("[DONE] {} saved {} dishes", cuisine, outcome.dishes.len());
                tokio::time::sleep(Duration::from_secs(PACING_DELAY_SECS)).await;
            }
            Err(e) => {
                error!("[ERROR] {}: {}", cuisine, e);
            }
        }
    }

    info!("Pre-generation complete");
    Ok(())
}
