use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::info;

use tab_summarizer::{
    AppState,
    config::Config,
    http::router,
    llm::LlmClient,
    logging,
    orchestrator::Orchestrator,
    settings::{FileSettingsStore, SettingsStore},
    tabs::BrowserTabs,
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env();

    let http_client = Client::builder()
        .connect_timeout(config.connection_timeout)
        .pool_idle_timeout(config.idle_connection_timeout)
        .build()?;

    let settings: Arc<dyn SettingsStore> =
        Arc::new(FileSettingsStore::new(config.settings_path.clone()));
    info!("Settings stored at {}", config.settings_path.display());

    let tabs = Arc::new(BrowserTabs::new(
        http_client.clone(),
        config.page_fetch_timeout,
    ));
    let llm = Arc::new(LlmClient::new(http_client, Arc::clone(&settings)));
    let orchestrator = Orchestrator::start(tabs.clone(), llm);

    let state = AppState {
        orchestrator,
        settings,
        tabs,
    };

    let listener = TcpListener::bind(&config.listen).await?;
    info!("Server running on {}", config.listen);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
