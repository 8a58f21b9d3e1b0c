mod config;
mod flow;
mod poster;
mod sessions;
mod storage;
mod tg;
mod view;

use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env()?;
    let bot = Bot::from_env();

    // путь к файлу каталога (можно через ENV)
    let catalog = storage::Catalog::open(&config.store_path).await?;
    if let Some(legacy) = &config.legacy_json_path {
        // переносим старый дамп только в пустой каталог, иначе будут дубли
        if catalog.list(true).await.is_empty() {
            catalog.import_legacy(legacy).await;
        } else {
            info!(path = %legacy.display(), "catalog is not empty, legacy import skipped");
        }
    }

    let app = tg::App {
        posters: poster::PosterValidator::new(config.poster_timeout)?,
        sessions: sessions::SessionManager::new(config.session_ttl),
        catalog,
        config: Arc::new(config),
    };

    tg::run(bot, app).await;
    Ok(())
}
