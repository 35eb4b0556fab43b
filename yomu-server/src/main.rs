//! Process bootstrap: configuration, storage, cache warm-up, HTTP serve.

mod api;
mod config;
mod deepseek;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use yomu_core::LexiconCache;

use crate::config::Config;
use crate::deepseek::DeepSeekClient;
use crate::store::PgVocabStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("yomu_server=info,yomu_core=info,tower_http=debug")
            }),
        )
        .init();

    let config = Config::from_env();
    if config.deepseek_api_key.is_empty() {
        warn!("DEEPSEEK_API_KEY is not set; sense disambiguation will keep default selections");
    }

    info!("connecting to database");
    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgVocabStore::new(pool));
    let lexicon = Arc::new(LexiconCache::new());

    info!("loading lexicon cache");
    let snapshot = store.lexicon_snapshot().await?;
    lexicon.reload(snapshot);
    info!(
        keys = lexicon.len(),
        max_key_len = lexicon.max_key_len(),
        "lexicon cache loaded"
    );

    let oracle = Arc::new(DeepSeekClient::new(
        config.deepseek_api_key.clone(),
        config.deepseek_base_url.clone(),
        Duration::from_secs(config.oracle_timeout_secs),
    )?);

    let app = api::router(api::AppState {
        lexicon,
        store,
        oracle,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    info!("starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
