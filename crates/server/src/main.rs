use anyhow::Context;
use std::sync::Arc;

mod config;
mod routes;

pub struct AppState {
    pub store: kontera_storage::DocStore,
    pub llm: kontera_llm::OpenAiCompletion,
    pub index_cap: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::load().context("loading configuration")?;
    if config.completion.api_key.is_none() {
        tracing::warn!("no completion API key configured; enrichment calls will fail");
    }

    let store = kontera_storage::DocStore::open(&config.database)
        .await
        .with_context(|| format!("opening document store at {}", config.database.display()))?;
    let llm = kontera_llm::OpenAiCompletion::new(
        config.completion.api_key.clone().unwrap_or_default(),
        config.completion.model.clone(),
        config.completion.base_url.clone(),
    )?;

    let state = Arc::new(AppState { store, llm, index_cap: config.duplicate_index_cap });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!("listening on {}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
